//! Processed-set tracker: the durable record of which source documents have
//! already contributed chunks to the vector store.
//!
//! The backing store is a flat, append-only, line-oriented UTF-8 file: one
//! source identifier per line. [`ProcessedLog::load`] parses it into a set
//! (trimming blank lines); [`ProcessedLog::mark`] appends one line and
//! flushes durably before returning. Duplicate lines are tolerated (the set
//! de-duplicates on the next load), so marking twice is safe.
//!
//! This tracker assumes a single-process batch job. Concurrent writers are
//! out of scope; callers that parallelize record processing must serialize
//! their `mark` calls.
//!
//! Any I/O failure here is fatal to the whole indexing run: without durable
//! tracking, idempotence cannot be guaranteed, so the run must stop rather
//! than risk duplicate or missing processing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// I/O failure against the processed-set file.
#[derive(Debug, thiserror::Error)]
#[error("processed-set file error at {path}: {source}")]
pub struct TrackerError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Append-only log of processed source identifiers.
#[derive(Debug, Clone)]
pub struct ProcessedLog {
    path: PathBuf,
}

impl ProcessedLog {
    /// Create a tracker over the given file path. The file need not exist
    /// yet; a missing file reads as an empty set.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the set of already-processed source identifiers.
    ///
    /// A missing file is not an error: the first run starts from an empty
    /// set and treats every record as new.
    pub async fn load(&self) -> Result<HashSet<String>, TrackerError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No processed-set file at {}, starting empty", self.path.display());
                return Ok(HashSet::new());
            }
            Err(source) => {
                return Err(TrackerError {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Append one source identifier and flush it durably before returning.
    ///
    /// The caller must only invoke this after the record's chunks have been
    /// successfully upserted; the write-then-mark ordering is what makes
    /// interrupted runs safe to retry.
    pub async fn mark(&self, source_id: &str) -> Result<(), TrackerError> {
        let io = async {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(format!("{source_id}\n").as_bytes()).await?;
            file.sync_data().await?;
            Ok::<(), std::io::Error>(())
        };

        io.await.map_err(|source| TrackerError {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_loads_as_empty_set() {
        let dir = tempdir().unwrap();
        let log = ProcessedLog::new(dir.path().join("_processed_cds_lists.txt"));
        let set = log.load().await.unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn mark_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let log = ProcessedLog::new(dir.path().join("_processed_cds_lists.txt"));

        log.mark("mit.json").await.unwrap();
        log.mark("harvard.json").await.unwrap();

        let set = log.load().await.unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("mit.json"));
        assert!(set.contains("harvard.json"));
    }

    #[tokio::test]
    async fn duplicate_marks_are_tolerated() {
        let dir = tempdir().unwrap();
        let log = ProcessedLog::new(dir.path().join("processed.txt"));

        log.mark("mit.json").await.unwrap();
        log.mark("mit.json").await.unwrap();

        // The file may contain duplicate lines; the set de-duplicates.
        let set = log.load().await.unwrap();
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn blank_lines_are_trimmed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processed.txt");
        tokio::fs::write(&path, "mit.json\n\n  \nharvard.json\n")
            .await
            .unwrap();

        let set = ProcessedLog::new(&path).load().await.unwrap();
        assert_eq!(set.len(), 2);
    }
}
