//! # cds-embed
//!
//! Remote embedding client for the CDS indexing pipeline.
//!
//! Wraps the Gemini `embedContent` REST endpoint behind the
//! [`EmbeddingProvider`] trait: text in, fixed-length `Vec<f32>` out. The
//! client owns the failure policy for that one call (transport errors,
//! non-2xx statuses, and malformed bodies all collapse into [`EmbedError`])
//! but never retries; skip/retry decisions belong to the caller.
//!
//! The target dimensionality (768 for this deployment) is requested in the
//! call itself, not truncated afterwards, so vectors match the store's
//! provisioned dimension by construction.
//!
//! ## Modules
//!
//! - [`config`]: client configuration (API key, endpoint, model, timeout)
//! - [`provider`]: the [`EmbeddingProvider`] trait and Gemini implementation
//! - [`error`]: [`EmbedError`] and result handling

pub mod config;
pub mod error;
pub mod provider;

pub use config::{EMBEDDING_DIMENSION, EmbedConfig};
pub use error::{EmbedError, Result};
pub use provider::{EmbeddingProvider, GeminiEmbedProvider};
