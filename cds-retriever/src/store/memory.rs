//! In-memory implementation of the vector store boundary
//!
//! Used by the integration tests and by local dry runs where no Pinecone
//! index is available. Semantics mirror the remote store: overwrite-by-id
//! upserts and cosine-ranked queries.

use super::{ScoredMatch, StoreError, VectorEntry, VectorStore, check_dimensions};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Vector store held entirely in process memory.
#[derive(Debug)]
pub struct MemoryStore {
    dimension: usize,
    entries: RwLock<HashMap<String, VectorEntry>>,
}

impl MemoryStore {
    /// Create an empty store provisioned for the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Ids currently held, in no particular order.
    pub async fn ids(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<(), StoreError> {
        check_dimensions(&entries, self.dimension)?;
        let mut held = self.entries.write().await;
        for entry in entries {
            held.insert(entry.id.clone(), entry);
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>, StoreError> {
        if vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
                id: "<query>".to_string(),
            });
        }

        let held = self.entries.read().await;
        let mut scored: Vec<ScoredMatch> = held
            .values()
            .map(|entry| ScoredMatch {
                id: entry.id.clone(),
                score: cosine_similarity(vector, &entry.values),
                metadata: if include_metadata {
                    entry.metadata.clone()
                } else {
                    HashMap::new()
                },
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
