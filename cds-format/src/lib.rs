//! # cds-format
//!
//! Pure data-model and text-formatting crate for the CDS indexing pipeline.
//!
//! This crate turns one extracted Common Data Set record into a set of
//! independently retrievable text blocks:
//!
//! - [`record`]: the [`StructuredRecord`] wrapper around an extracted
//!   section mapping, plus the single canonical decode for raw extraction
//!   output.
//! - [`sections`]: fixed English templates that render each known section as
//!   field-labeled prose, with a generic fallback for unknown sections.
//!
//! Everything here is pure and synchronous; embedding, storage, and
//! orchestration live in `cds-embed` and `cds-retriever`.

pub mod record;
pub mod sections;

pub use record::{DecodeError, StructuredRecord};
pub use sections::{NONE_MARKER, NOT_AVAILABLE, format_fallback, format_section};
