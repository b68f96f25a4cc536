//! Pinecone REST implementation of the vector store boundary

use super::{ScoredMatch, StoreError, VectorEntry, VectorStore, check_dimensions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a deployed Pinecone index.
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    /// API key sent in the `Api-Key` header
    pub api_key: String,
    /// Host of the index, e.g. `https://college-consulting-index-xxxx.svc.pinecone.io`
    pub index_host: String,
    /// Dimension the index was provisioned with
    pub dimension: usize,
    /// Call-level timeout for a single store request
    pub timeout: Duration,
}

impl PineconeConfig {
    /// Configuration with deployment defaults (768 dimensions, 30 s timeout).
    pub fn new(api_key: impl Into<String>, index_host: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            index_host: index_host.into(),
            dimension: cds_embed::EMBEDDING_DIMENSION,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorEntry],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ScoredMatch>,
}

/// Vector store backed by a Pinecone serverless index over REST.
pub struct PineconeStore {
    config: PineconeConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for PineconeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeStore")
            .field("index_host", &self.config.index_host)
            .field("dimension", &self.config.dimension)
            .finish()
    }
}

impl PineconeStore {
    /// Create a store client for a deployed index.
    pub fn new(config: PineconeConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.index_host.trim_end_matches('/'))
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, StoreError> {
        let response = self
            .client
            .post(self.url(path))
            .header("Api-Key", &self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        check_dimensions(&entries, self.config.dimension)?;

        tracing::debug!("Upserting {} vectors to Pinecone", entries.len());
        self.post("vectors/upsert", &UpsertRequest { vectors: &entries })
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>, StoreError> {
        if vector.len() != self.config.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
                id: "<query>".to_string(),
            });
        }

        let response = self
            .post(
                "query",
                &QueryRequest {
                    vector,
                    top_k,
                    include_metadata,
                },
            )
            .await?;

        let body: QueryResponse = response.json().await.map_err(|e| StoreError::Malformed {
            message: format!("failed to decode query response: {e}"),
        })?;
        Ok(body.matches)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn query_request_uses_pinecone_field_names() {
        let vector = vec![0.1_f32, 0.2];
        let request = QueryRequest {
            vector: &vector,
            top_k: 5,
            include_metadata: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["topK"], 5);
        assert_eq!(json["includeMetadata"], true);
        assert!(json["vector"].is_array());
    }

    #[test]
    fn query_response_decodes_matches_with_metadata() {
        let body = r#"{
            "matches": [
                {"id": "mit.json#general_info", "score": 0.87,
                 "metadata": {"institution_name": "MIT", "section": "general_info"}}
            ]
        }"#;
        let decoded: QueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.matches.len(), 1);
        assert_eq!(decoded.matches[0].id, "mit.json#general_info");
        assert_eq!(
            decoded.matches[0].metadata.get("institution_name"),
            Some(&"MIT".to_string())
        );
    }

    #[test]
    fn upsert_rejects_wrong_dimension_before_sending() {
        let entries = vec![VectorEntry {
            id: "x.json#general_info".to_string(),
            values: vec![0.0; 4],
            metadata: HashMap::new(),
        }];
        let err = check_dimensions(&entries, 768).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("x.json#general_info"));
    }
}
