//! Error types for the embedding client

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for remote embedding calls.
///
/// Transport failures, non-2xx responses, and malformed response bodies all
/// collapse into one type so a caller can apply a single skip/retry policy.
/// The exception is [`EmbedError::DimensionMismatch`], which signals a
/// configuration problem (the backend returned vectors of a different size
/// than the vector store is provisioned for) and should abort the run rather
/// than be skipped per item.
///
/// The client itself never retries; retry policy belongs to the caller.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Network-level failure: connection, TLS, or timeout
    #[error("embedding request failed: {source}")]
    Request {
        #[from]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status
    #[error("embedding backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body did not carry an embedding vector
    #[error("malformed embedding response: {message}")]
    MalformedResponse { message: String },

    /// The backend produced a vector of the wrong size for this deployment
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl EmbedError {
    /// Create a malformed-response error with a custom message.
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Whether this error indicates a deployment misconfiguration rather
    /// than a transient per-call failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }
}
