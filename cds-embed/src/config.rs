//! Configuration for the embedding client

use std::time::Duration;

/// Default embedding model for this deployment.
pub const DEFAULT_MODEL: &str = "gemini-embedding-001";

/// Default API base for the Gemini generative language API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Fixed embedding dimensionality for this deployment. Must match the vector
/// store's provisioned dimension.
pub const EMBEDDING_DIMENSION: usize = 768;

/// Configuration for [`GeminiEmbedProvider`](crate::provider::GeminiEmbedProvider).
#[derive(Debug, Clone)]
pub struct EmbedConfig {
    /// API key for the embedding backend
    pub api_key: String,
    /// Base URL of the embedding API
    pub api_base: String,
    /// Model identifier
    pub model_name: String,
    /// Target dimensionality, requested explicitly in every call
    pub dimension: usize,
    /// Call-level timeout for a single embedding request
    pub timeout: Duration,
}

impl EmbedConfig {
    /// Create a configuration with deployment defaults for the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model_name: DEFAULT_MODEL.to_string(),
            dimension: EMBEDDING_DIMENSION,
            timeout: Duration::from_secs(30),
        }
    }

    /// Override the API base URL (used by tests to point at a local server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Override the model identifier.
    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    /// Override the call-level timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
