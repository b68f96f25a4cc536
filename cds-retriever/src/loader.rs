//! Record loading for the batch CLI: walk a data directory of extraction
//! output files and decode each into a [`StructuredRecord`].
//!
//! Producing records is an external collaborator's job as far as the
//! pipeline is concerned; the pipeline itself consumes any slice of
//! records. This module is the concrete collaborator the `index` subcommand
//! uses: one record per `*.json` file, decoded through the canonical
//! boundary decode. Files that fail to decode are logged and skipped so one
//! malformed extraction cannot block the batch.

use anyhow::{Context, Result};
use cds_format::StructuredRecord;
use std::path::Path;
use tracing::{debug, warn};

/// Name of the processed-set file kept alongside the data files. Skipped
/// during loading along with any other underscore-prefixed bookkeeping file.
pub const PROCESSED_LIST_FILE: &str = "_processed_cds_lists.txt";

/// Load every decodable record from `*.json` files in `data_dir`, sorted by
/// filename for a deterministic processing order.
pub async fn load_records(data_dir: &Path) -> Result<Vec<StructuredRecord>> {
    let mut read_dir = tokio::fs::read_dir(data_dir)
        .await
        .with_context(|| format!("failed to read data directory {}", data_dir.display()))?;

    let mut paths = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let is_bookkeeping = entry.file_name().to_string_lossy().starts_with('_');
        if is_json && !is_bookkeeping {
            paths.push(path);
        }
    }
    paths.sort();

    let mut records = Vec::new();
    for path in paths {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        match StructuredRecord::parse(&raw, filename.clone()) {
            Ok(record) => {
                debug!("Loaded record {filename}");
                records.push(record);
            }
            Err(e) => {
                warn!("Skipping {filename}: {e}");
            }
        }
    }

    Ok(records)
}
