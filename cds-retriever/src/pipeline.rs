//! Indexing pipeline: structured records in, embedded chunks in the vector
//! store out.
//!
//! For each record not yet in the processed set, the pipeline formats every
//! section as prose, embeds each section independently, and upserts all of
//! the record's successful chunks as one batch keyed by deterministic ids
//! (`source_id#section`). Only after a successful non-empty upsert is the
//! record marked processed, which yields the core guarantee: a record is
//! marked if and only if at least one of its chunks was durably written this
//! run, and the store write always precedes the mark.
//!
//! Failure propagation follows the taxonomy in the crate docs: a failed
//! embedding skips that section only; a failed upsert skips that record's
//! mark only (the record retries next run); tracker I/O failures and
//! dimension mismatches abort the run.

use crate::store::{VectorEntry, VectorStore};
use crate::tracker::ProcessedLog;
use anyhow::Result;
use cds_embed::EmbeddingProvider;
use cds_format::{StructuredRecord, format_fallback, format_section};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the indexing pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Fixed delay between records, as crude rate limiting toward the
    /// embedding backend. A throughput ceiling, not a correctness mechanism.
    pub record_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            record_delay: Duration::from_secs(1),
        }
    }
}

impl PipelineConfig {
    /// Override the inter-record delay (tests set this to zero).
    pub fn with_record_delay(mut self, delay: Duration) -> Self {
        self.record_delay = delay;
        self
    }
}

/// Counters describing one pipeline run.
#[derive(Debug, Default, Clone)]
pub struct PipelineStats {
    /// Records newly indexed and marked processed this run
    pub records_indexed: usize,
    /// Records skipped because they were already in the processed set
    pub records_skipped: usize,
    /// Records left unmarked because no section produced a chunk or the
    /// upsert failed
    pub records_deferred: usize,
    /// Chunks successfully upserted
    pub chunks_upserted: usize,
    /// Sections skipped due to embedding failures
    pub sections_failed: usize,
}

/// Orchestrates formatting, embedding, upserting, and processed-set marking
/// for a batch of structured records.
///
/// The provider and store are injected handles scoped to the pipeline's
/// lifetime; there is no process-global client state.
pub struct IndexingPipeline {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    tracker: ProcessedLog,
    config: PipelineConfig,
}

impl IndexingPipeline {
    /// Create a pipeline over the given embedding provider, vector store,
    /// and processed-set tracker.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        tracker: ProcessedLog,
        config: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            store,
            tracker,
            config,
        }
    }

    /// Index every record not yet in the processed set.
    ///
    /// Returns statistics for the run, including the count of newly indexed
    /// records. The processed set is snapshotted once at the start; records
    /// completed mid-run by another process are not re-read.
    ///
    /// # Errors
    /// Tracker I/O failures and dimension mismatches abort the run. All
    /// other failures are logged and contained to the section or record they
    /// occurred in.
    pub async fn run(&self, records: &[StructuredRecord]) -> Result<PipelineStats> {
        let processed = self.tracker.load().await?;
        info!(
            "Starting indexing run: {} records, {} already processed",
            records.len(),
            processed.len()
        );

        let mut stats = PipelineStats::default();
        for record in records {
            if processed.contains(record.source_id()) {
                debug!("Skipping already-processed record {}", record.source_id());
                stats.records_skipped += 1;
                continue;
            }

            self.index_record(record, &mut stats).await?;

            // Rate limiting toward the embedding backend.
            if !self.config.record_delay.is_zero() {
                tokio::time::sleep(self.config.record_delay).await;
            }
        }

        info!(
            "Indexing run complete: {} newly indexed, {} skipped, {} deferred",
            stats.records_indexed, stats.records_skipped, stats.records_deferred
        );
        Ok(stats)
    }

    /// Process one record: build chunks, upsert the batch, mark processed.
    async fn index_record(&self, record: &StructuredRecord, stats: &mut PipelineStats) -> Result<()> {
        let source_id = record.source_id();
        debug!("Indexing record {source_id}");

        let mut entries = Vec::new();
        for (section_name, section_value) in record.sections() {
            match self.build_chunk(record, section_name, section_value).await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => stats.sections_failed += 1,
                Err(e) => return Err(e),
            }
        }

        if entries.is_empty() {
            // Every section failed to embed. Leave the record unmarked so a
            // later run retries it.
            warn!("No vectors generated for {source_id}, leaving unprocessed");
            stats.records_deferred += 1;
            return Ok(());
        }

        let count = entries.len();
        match self.store.upsert(entries).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("Upsert failed for {source_id}, will retry next run: {e}");
                stats.records_deferred += 1;
                return Ok(());
            }
        }

        // The upsert succeeded, so marking is now safe. A tracker failure
        // here still aborts the run: idempotence depends on durable marks.
        self.tracker.mark(source_id).await?;
        stats.chunks_upserted += count;
        stats.records_indexed += 1;
        info!("Indexed {count} chunks for {source_id}");
        Ok(())
    }

    /// Format and embed one section. Returns `Ok(None)` when the section's
    /// embedding failed and should be skipped; returns an error only for
    /// fatal misconfiguration.
    async fn build_chunk(
        &self,
        record: &StructuredRecord,
        section_name: &str,
        section_value: &serde_json::Value,
    ) -> Result<Option<VectorEntry>> {
        let mut text = format_section(record.institution_name(), section_name, section_value);
        if text.trim().is_empty() {
            // Never skip a section silently; fall back to raw serialization.
            text = format_fallback(record.institution_name(), section_name, section_value);
        }

        let values = match self.provider.embed(&text).await {
            Ok(values) if values.is_empty() => {
                warn!(
                    "Empty embedding for section '{section_name}' of {}, skipping",
                    record.source_id()
                );
                return Ok(None);
            }
            Ok(values) => values,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(
                    "Failed to embed section '{section_name}' of {}: {e}",
                    record.source_id()
                );
                return Ok(None);
            }
        };

        // Deterministic id: at most one chunk per (record, section), and a
        // re-run overwrites instead of duplicating.
        let id = format!("{}#{section_name}", record.source_id());
        let metadata = HashMap::from([
            ("source_file".to_string(), record.source_file().to_string()),
            (
                "institution_name".to_string(),
                record.institution_name().to_string(),
            ),
            ("section".to_string(), section_name.to_string()),
            ("text".to_string(), text),
        ]);

        Ok(Some(VectorEntry {
            id,
            values,
            metadata,
        }))
    }
}
