//! # cds-retriever
//!
//! Indexing and retrieval core for the college-admissions question answering
//! system: turns extracted Common Data Set records into embedded chunks in a
//! vector store, tracks which source documents have already been indexed so
//! incremental runs are idempotent, and serves top-k semantic retrieval for
//! pre-normalized queries.
//!
//! ## Modules
//!
//! - [`pipeline`]: the batch indexing orchestrator (format, embed, upsert,
//!   mark processed)
//! - [`search`]: the retrieval service (embed query, similarity search,
//!   ranked report)
//! - [`store`]: the vector store boundary (Pinecone REST + in-memory)
//! - [`tracker`]: the append-only processed-set file
//! - [`loader`]: record loading for the batch CLI
//!
//! ## Failure containment
//!
//! Failures local to one section never abort the containing record;
//! failures local to one record never abort the batch run. Only
//! processed-set I/O failures and vector-dimension misconfiguration abort a
//! run, because idempotence cannot be guaranteed without them.

pub mod loader;
pub mod pipeline;
pub mod search;
pub mod store;
pub mod tracker;

pub use pipeline::{IndexingPipeline, PipelineConfig, PipelineStats};
pub use search::{DEFAULT_TOP_K, RetrievalService, SearchError};
pub use store::{ScoredMatch, StoreError, VectorEntry, VectorStore};
pub use tracker::{ProcessedLog, TrackerError};
