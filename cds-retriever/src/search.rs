//! Retrieval service: top-k semantic search over the indexed chunks.
//!
//! [`RetrievalService::search`] is the boundary the downstream
//! answer-generation step consumes: it always returns well-formed,
//! human-readable text: either a ranked report of matches, an explicit
//! "no results" message, or an explicit "could not process query" message.
//! It never propagates an error past its own boundary. The typed
//! [`RetrievalService::search_matches`] underneath is the seam tests and
//! structured callers use.

use crate::store::{ScoredMatch, StoreError, VectorStore};
use cds_embed::{EmbedError, EmbeddingProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// Default number of matches requested per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Errors from a single retrieval query.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The query text could not be embedded
    #[error("failed to embed query: {source}")]
    Embed {
        #[from]
        source: EmbedError,
    },

    /// The query text was empty, so no embedding was generated
    #[error("query text was empty")]
    EmptyQuery,

    /// The similarity query against the store failed; no partial results
    #[error("vector store query failed: {source}")]
    Store {
        #[from]
        source: StoreError,
    },
}

/// Stateless semantic search over the vector store. Each query is an
/// independent read-only round trip (embed, then similarity search), so the
/// service is trivially shareable across tasks.
pub struct RetrievalService {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl RetrievalService {
    /// Create a service over the given embedding provider and vector store.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { provider, store }
    }

    /// Embed the (pre-normalized) query and return the store's `top_k`
    /// nearest matches with metadata, in the store's descending similarity
    /// order. Fewer matches than `top_k` is normal for a small index.
    pub async fn search_matches(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredMatch>, SearchError> {
        let vector = self.provider.embed(query).await?;
        if vector.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let matches = self.store.query(&vector, top_k, true).await?;
        Ok(matches)
    }

    /// Run a query and format the outcome as report text for the downstream
    /// answer-generation step. Always returns non-empty text.
    pub async fn search(&self, query: &str, top_k: usize) -> String {
        info!("Searching with query: {query}");

        match self.search_matches(query, top_k).await {
            Ok(matches) if matches.is_empty() => {
                "No relevant college information found for your query.".to_string()
            }
            Ok(matches) => format_report(&matches),
            Err(e @ (SearchError::Embed { .. } | SearchError::EmptyQuery)) => {
                warn!("Could not embed query: {e}");
                "Could not process the query. Please try again.".to_string()
            }
            Err(SearchError::Store { source }) => {
                warn!("Store query failed: {source}");
                format!("Error querying the college index: {source}")
            }
        }
    }
}

/// Render matches as a ranked, human-readable report.
fn format_report(matches: &[ScoredMatch]) -> String {
    let mut out = format!("Found {} relevant results:\n", matches.len());

    for (i, m) in matches.iter().enumerate() {
        let institution = metadata_or(m, "institution_name");
        let section = metadata_or(m, "section");
        let source = metadata_or(m, "source_file");
        let text = metadata_or(m, "text");

        out.push_str(&format!(
            "\n---\n### Result #{rank} (Relevance: {score:.2}%)\n\
             - Institution: {institution}\n\
             - Section: {section}\n\
             - Source: {source}\n\
             \n\
             Content:\n{text}\n",
            rank = i + 1,
            score = m.score * 100.0,
        ));
    }

    out
}

fn metadata_or<'a>(m: &'a ScoredMatch, key: &str) -> &'a str {
    m.metadata.get(key).map(String::as_str).unwrap_or("N/A")
}
