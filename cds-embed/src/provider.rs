//! Embedding provider trait and the Gemini REST implementation

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trait for providers that turn text into fixed-length embedding vectors.
///
/// The pipeline and retrieval service depend on this trait rather than a
/// concrete client, so tests can inject a deterministic provider and the
/// backend can change without touching the orchestration code.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    ///
    /// Empty or whitespace-only input returns an empty vector without a
    /// network call; that is a caller error, not a retryable failure.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The dimension of vectors produced by this provider.
    fn dimension(&self) -> usize;

    /// Name/identifier of this provider, for logging.
    fn provider_name(&self) -> &str;
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    content: Content<'a>,
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Option<Vec<f32>>,
}

/// Embedding provider backed by the Gemini `embedContent` REST endpoint.
///
/// The target dimensionality is requested explicitly in every call rather
/// than truncated after the fact, so the backend's vectors match the vector
/// store's provisioned dimension by construction.
pub struct GeminiEmbedProvider {
    config: EmbedConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiEmbedProvider")
            .field("model", &self.config.model_name)
            .field("dimension", &self.config.dimension)
            .finish()
    }
}

impl GeminiEmbedProvider {
    /// Create a provider from a configuration.
    ///
    /// Builds a dedicated HTTP client with the configured call-level timeout,
    /// which converts backend hangs into [`EmbedError::Request`] instead of a
    /// silent infinite wait.
    pub fn new(config: EmbedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:embedContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model_name
        )
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            tracing::debug!("Empty text submitted for embedding, skipping network call");
            return Ok(Vec::new());
        }

        let request = EmbedContentRequest {
            content: Content {
                parts: vec![Part { text }],
            },
            output_dimensionality: self.config.dimension,
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::malformed(format!("failed to decode body: {e}")))?;

        let values = body
            .embedding
            .and_then(|e| e.values)
            .ok_or_else(|| EmbedError::malformed("response missing embedding.values"))?;

        if values.len() != self.config.dimension {
            return Err(EmbedError::DimensionMismatch {
                expected: self.config.dimension,
                actual: values.len(),
            });
        }

        Ok(values)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn provider_name(&self) -> &str {
        &self.config.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbedConfig;

    #[test]
    fn request_body_carries_text_and_dimensionality() {
        let request = EmbedContentRequest {
            content: Content {
                parts: vec![Part {
                    text: "Test College tuition",
                }],
            },
            output_dimensionality: 768,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["content"]["parts"][0]["text"], "Test College tuition");
        assert_eq!(json["output_dimensionality"], 768);
    }

    #[test]
    fn response_decode_extracts_values() {
        let body = r#"{"embedding": {"values": [0.1, 0.2, 0.3]}}"#;
        let decoded: EmbedContentResponse = serde_json::from_str(body).unwrap();
        let values = decoded.embedding.and_then(|e| e.values).unwrap();
        assert_eq!(values, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn response_decode_tolerates_missing_vector() {
        let body = r#"{"error": {"message": "quota exceeded"}}"#;
        let decoded: EmbedContentResponse = serde_json::from_str(body).unwrap();
        assert!(decoded.embedding.is_none());
    }

    #[tokio::test]
    async fn empty_text_short_circuits_without_network() {
        // Unroutable endpoint: if a request were attempted this would error.
        let config = EmbedConfig::new("test-key")
            .with_api_base("http://127.0.0.1:1")
            .with_timeout(std::time::Duration::from_millis(100));
        let provider = GeminiEmbedProvider::new(config).unwrap();
        let vector = provider.embed("   ").await.unwrap();
        assert!(vector.is_empty());
    }

    #[test]
    fn endpoint_includes_model_name() {
        let config = EmbedConfig::new("test-key");
        let provider = GeminiEmbedProvider::new(config).unwrap();
        assert!(
            provider
                .endpoint()
                .ends_with("/v1beta/models/gemini-embedding-001:embedContent")
        );
    }
}
