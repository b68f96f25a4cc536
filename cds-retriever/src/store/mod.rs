//! Vector store boundary for cds-retriever
//!
//! This module defines the trait the indexing pipeline and retrieval service
//! write to and read from, plus two implementations:
//!
//! - [`pinecone::PineconeStore`]: REST client for the deployed Pinecone index
//! - [`memory::MemoryStore`]: in-process store for tests and local dry runs
//!
//! The store owns entry lifecycle; this crate only creates or overwrites
//! entries by id. Upserting an existing id is an overwrite, never a
//! duplicate, which is what makes re-running the pipeline on a partially
//! indexed record safe.
//!
//! Vector dimensionality is fixed per deployment (768 here). Both
//! implementations check every vector against the configured dimension before
//! accepting it; a mismatch is a configuration error, not a per-item failure.

use async_trait::async_trait;
use std::collections::HashMap;

pub mod memory;
pub mod pinecone;

/// Errors from vector store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Network-level failure reaching the store
    #[error("vector store request failed: {source}")]
    Request {
        #[from]
        source: reqwest::Error,
    },

    /// The store answered with a non-success status
    #[error("vector store returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The store's response could not be decoded
    #[error("malformed vector store response: {message}")]
    Malformed { message: String },

    /// A vector did not match the store's configured dimension. This is a
    /// deployment misconfiguration and should abort the run.
    #[error("vector dimension mismatch: store expects {expected}, got {actual} for id {id}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        id: String,
    },
}

impl StoreError {
    /// Whether this error indicates a deployment misconfiguration rather
    /// than a transient failure worth retrying on a later run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }
}

/// One entry held by the vector store: id, embedding, display metadata.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VectorEntry {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

/// One match returned by a similarity query, in store ranking order.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ScoredMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Insert-or-overwrite and nearest-neighbor operations against a vector
/// index. Implementations must preserve overwrite-by-id semantics and return
/// query matches in descending similarity order.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert a batch of entries as a single atomic call.
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<(), StoreError>;

    /// Query the `top_k` nearest entries to `vector`, most similar first.
    /// Returns fewer than `top_k` matches when the index holds fewer entries.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>, StoreError>;

    /// The dimension this store is provisioned for.
    fn dimension(&self) -> usize;
}

/// Check a batch of entries against the configured dimension before sending.
pub(crate) fn check_dimensions(entries: &[VectorEntry], expected: usize) -> Result<(), StoreError> {
    for entry in entries {
        if entry.values.len() != expected {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: entry.values.len(),
                id: entry.id.clone(),
            });
        }
    }
    Ok(())
}
