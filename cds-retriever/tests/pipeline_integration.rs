//! Integration tests for the indexing pipeline and retrieval service.
//!
//! These run the real pipeline against the in-memory vector store and a
//! deterministic mock embedding provider, covering the core guarantees:
//! - idempotence: a second run over an unchanged record set writes nothing
//! - deterministic chunk identity: re-indexing overwrites, never duplicates
//! - partial-failure isolation: one failed section does not lose the record
//! - processed-marking rules: marked if and only if chunks were written

use async_trait::async_trait;
use cds_embed::{EmbedError, EmbeddingProvider};
use cds_format::StructuredRecord;
use cds_retriever::pipeline::{IndexingPipeline, PipelineConfig};
use cds_retriever::search::RetrievalService;
use cds_retriever::store::memory::MemoryStore;
use cds_retriever::store::{ScoredMatch, StoreError, VectorEntry, VectorStore};
use cds_retriever::tracker::ProcessedLog;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;

const TEST_DIMENSION: usize = 8;

/// Deterministic stand-in for the remote embedding backend.
struct MockProvider {
    /// Sections whose formatted text contains this substring fail to embed.
    fail_on: Option<String>,
    calls: AtomicUsize,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            fail_on: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing_on(substring: &str) -> Self {
        Self {
            fail_on: Some(substring.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

/// Map text to a stable nonzero vector so similarity is reproducible.
fn deterministic_vector(text: &str) -> Vec<f32> {
    let mut values = vec![1.0_f32; TEST_DIMENSION];
    for (i, byte) in text.bytes().enumerate() {
        values[i % TEST_DIMENSION] += byte as f32;
    }
    values
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    async fn embed(&self, text: &str) -> cds_embed::Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        if let Some(fail_on) = &self.fail_on {
            if text.contains(fail_on) {
                return Err(EmbedError::Http {
                    status: 503,
                    body: "backend unavailable".to_string(),
                });
            }
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(deterministic_vector(text))
    }

    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

/// Provider that reports a vector-size misconfiguration on every call.
struct MisconfiguredProvider;

#[async_trait]
impl EmbeddingProvider for MisconfiguredProvider {
    async fn embed(&self, _text: &str) -> cds_embed::Result<Vec<f32>> {
        Err(EmbedError::DimensionMismatch {
            expected: TEST_DIMENSION,
            actual: 1536,
        })
    }

    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }

    fn provider_name(&self) -> &str {
        "misconfigured"
    }
}

/// Wrapper that counts upsert calls, for the idempotence assertions.
struct CountingStore {
    inner: MemoryStore,
    upsert_calls: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(TEST_DIMENSION),
            upsert_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VectorStore for CountingStore {
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<(), StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(entries).await
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>, StoreError> {
        self.inner.query(vector, top_k, include_metadata).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

/// Store whose upserts always fail, for the deferred-record test.
struct BrokenStore;

#[async_trait]
impl VectorStore for BrokenStore {
    async fn upsert(&self, _entries: Vec<VectorEntry>) -> Result<(), StoreError> {
        Err(StoreError::Http {
            status: 500,
            body: "index unavailable".to_string(),
        })
    }

    async fn query(
        &self,
        _vector: &[f32],
        _top_k: usize,
        _include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>, StoreError> {
        Ok(Vec::new())
    }

    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }
}

fn test_record() -> StructuredRecord {
    StructuredRecord::decode(
        json!({
            "general_info": {"institution_name": "Test College", "school_type": "Private"},
            "admissions_statistics": {"acceptance_rate": 5.2, "applicants": {"total": 1000}}
        }),
        "x.json",
    )
    .unwrap()
}

fn pipeline_over(
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    tracker: ProcessedLog,
) -> IndexingPipeline {
    let config = PipelineConfig::default().with_record_delay(Duration::ZERO);
    IndexingPipeline::new(provider, store, tracker, config)
}

#[tokio::test]
async fn indexes_every_section_and_marks_processed() {
    let dir = tempdir().unwrap();
    let tracker = ProcessedLog::new(dir.path().join("processed.txt"));
    let store = Arc::new(MemoryStore::new(TEST_DIMENSION));
    let provider = Arc::new(MockProvider::new());

    let pipeline = pipeline_over(provider, store.clone(), tracker.clone());
    let stats = pipeline.run(&[test_record()]).await.unwrap();

    assert_eq!(stats.records_indexed, 1);
    assert_eq!(stats.chunks_upserted, 2);

    // Every section present appears in exactly one chunk id.
    let mut ids = store.ids().await;
    ids.sort();
    assert_eq!(ids, vec!["x.json#admissions_statistics", "x.json#general_info"]);

    // Both chunks carry the institution name in their stored text.
    let matches = store
        .query(&deterministic_vector("anything"), 5, true)
        .await
        .unwrap();
    for m in &matches {
        assert_eq!(m.metadata.get("institution_name").unwrap(), "Test College");
        assert!(m.metadata.get("text").unwrap().contains("Test College"));
    }

    // Field values from the input survive into the indexed text.
    let stats_chunk = matches
        .iter()
        .find(|m| m.id == "x.json#admissions_statistics")
        .unwrap();
    assert!(stats_chunk.metadata.get("text").unwrap().contains("5.2"));
    assert!(stats_chunk.metadata.get("text").unwrap().contains("1000"));

    // Marked only after the upsert succeeded.
    let processed = tracker.load().await.unwrap();
    assert!(processed.contains("x.json"));
}

#[tokio::test]
async fn second_run_writes_nothing() {
    let dir = tempdir().unwrap();
    let tracker = ProcessedLog::new(dir.path().join("processed.txt"));
    let store = Arc::new(CountingStore::new());
    let provider = Arc::new(MockProvider::new());

    let pipeline = pipeline_over(provider.clone(), store.clone(), tracker);
    let records = [test_record()];

    let first = pipeline.run(&records).await.unwrap();
    assert_eq!(first.records_indexed, 1);
    assert_eq!(store.upsert_calls.load(Ordering::SeqCst), 1);
    let calls_after_first = provider.calls.load(Ordering::SeqCst);

    let second = pipeline.run(&records).await.unwrap();
    assert_eq!(second.records_indexed, 0);
    assert_eq!(second.records_skipped, 1);
    // No new embeddings and no new store writes on the second run.
    assert_eq!(store.upsert_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.calls.load(Ordering::SeqCst), calls_after_first);
}

#[tokio::test]
async fn reindexing_changed_record_overwrites_instead_of_duplicating() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::new(TEST_DIMENSION));

    // First pass with one tracker, then simulate a lost processed set with a
    // fresh one: the record re-runs, and the deterministic ids mean the
    // store overwrites rather than accumulating duplicates.
    let first_tracker = ProcessedLog::new(dir.path().join("processed_a.txt"));
    pipeline_over(Arc::new(MockProvider::new()), store.clone(), first_tracker)
        .run(&[test_record()])
        .await
        .unwrap();
    assert_eq!(store.len().await, 2);

    let changed = StructuredRecord::decode(
        json!({
            "general_info": {"institution_name": "Test College", "school_type": "Public"},
            "admissions_statistics": {"acceptance_rate": 6.0, "applicants": {"total": 1200}}
        }),
        "x.json",
    )
    .unwrap();

    let second_tracker = ProcessedLog::new(dir.path().join("processed_b.txt"));
    pipeline_over(Arc::new(MockProvider::new()), store.clone(), second_tracker)
        .run(&[changed])
        .await
        .unwrap();

    assert_eq!(store.len().await, 2);
    let matches = store
        .query(&deterministic_vector("anything"), 5, true)
        .await
        .unwrap();
    let info = matches
        .iter()
        .find(|m| m.id == "x.json#general_info")
        .unwrap();
    assert!(info.metadata.get("text").unwrap().contains("Public"));
}

#[tokio::test]
async fn failed_section_is_skipped_but_record_still_completes() {
    let dir = tempdir().unwrap();
    let tracker = ProcessedLog::new(dir.path().join("processed.txt"));
    let store = Arc::new(MemoryStore::new(TEST_DIMENSION));
    // The admissions statistics template opens with this phrase.
    let provider = Arc::new(MockProvider::failing_on("Admissions statistics"));

    let pipeline = pipeline_over(provider, store.clone(), tracker.clone());
    let stats = pipeline.run(&[test_record()]).await.unwrap();

    assert_eq!(stats.records_indexed, 1);
    assert_eq!(stats.sections_failed, 1);
    assert_eq!(stats.chunks_upserted, 1);
    assert_eq!(store.ids().await, vec!["x.json#general_info".to_string()]);

    // At least one chunk was written, so the record is marked processed.
    assert!(tracker.load().await.unwrap().contains("x.json"));
}

#[tokio::test]
async fn record_with_no_embeddable_sections_stays_unprocessed() {
    let dir = tempdir().unwrap();
    let tracker = ProcessedLog::new(dir.path().join("processed.txt"));
    let store = Arc::new(MemoryStore::new(TEST_DIMENSION));
    // Every template mentions the institution, so every section fails.
    let provider = Arc::new(MockProvider::failing_on("Test College"));

    let pipeline = pipeline_over(provider, store.clone(), tracker.clone());
    let stats = pipeline.run(&[test_record()]).await.unwrap();

    assert_eq!(stats.records_indexed, 0);
    assert_eq!(stats.records_deferred, 1);
    assert!(store.is_empty().await);
    // Left unmarked so a later run retries it.
    assert!(tracker.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_upsert_defers_the_record_without_marking() {
    let dir = tempdir().unwrap();
    let tracker = ProcessedLog::new(dir.path().join("processed.txt"));
    let provider = Arc::new(MockProvider::new());

    let pipeline = pipeline_over(provider, Arc::new(BrokenStore), tracker.clone());
    let stats = pipeline.run(&[test_record()]).await.unwrap();

    assert_eq!(stats.records_indexed, 0);
    assert_eq!(stats.records_deferred, 1);
    assert!(tracker.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn dimension_mismatch_aborts_the_run() {
    let dir = tempdir().unwrap();
    let tracker = ProcessedLog::new(dir.path().join("processed.txt"));
    let store = Arc::new(MemoryStore::new(TEST_DIMENSION));

    // Unlike a transient embedding failure, a wrong-size vector means the
    // deployment is misconfigured: the run must stop, not skip sections.
    let pipeline = pipeline_over(Arc::new(MisconfiguredProvider), store.clone(), tracker.clone());
    let result = pipeline.run(&[test_record()]).await;

    assert!(result.is_err());
    assert!(store.is_empty().await);
    assert!(tracker.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn search_returns_ranked_report_even_when_top_k_exceeds_matches() {
    let dir = tempdir().unwrap();
    let tracker = ProcessedLog::new(dir.path().join("processed.txt"));
    let store = Arc::new(MemoryStore::new(TEST_DIMENSION));
    let provider = Arc::new(MockProvider::new());

    pipeline_over(provider.clone(), store.clone(), tracker)
        .run(&[test_record()])
        .await
        .unwrap();

    let service = RetrievalService::new(provider, store);
    // Only 2 chunks exist; asking for 3 must not crash or pad.
    let report = service.search("Test College tuition", 3).await;

    assert!(report.contains("Found 2 relevant results"));
    assert!(report.contains("Result #1"));
    assert!(report.contains("Result #2"));
    assert!(!report.contains("Result #3"));
    assert!(report.contains("Test College"));
}

#[tokio::test]
async fn search_against_empty_store_reports_no_results() {
    let store = Arc::new(MemoryStore::new(TEST_DIMENSION));
    let provider = Arc::new(MockProvider::new());

    let service = RetrievalService::new(provider, store);
    let report = service.search("anything at all", 5).await;
    assert_eq!(report, "No relevant college information found for your query.");
}

#[tokio::test]
async fn search_surfaces_embedding_failure_as_text() {
    let store = Arc::new(MemoryStore::new(TEST_DIMENSION));
    let provider = Arc::new(MockProvider::failing_on("tuition"));

    let service = RetrievalService::new(provider, store);
    let report = service.search("tuition at Test College", 5).await;
    assert_eq!(report, "Could not process the query. Please try again.");
}
