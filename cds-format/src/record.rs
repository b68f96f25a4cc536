//! Structured record model and the boundary decode for raw extraction output.
//!
//! A [`StructuredRecord`] is one extracted Common Data Set document: a named,
//! nested mapping of sections (`general_info`, `admissions_statistics`, ...)
//! keyed by section name. The record is consumed as an opaque JSON mapping;
//! the full admissions schema lives upstream in the extraction step and is not
//! reproduced here. The only fields this crate reads directly are the
//! `metadata.source_file` identifier and `general_info.institution_name`.
//!
//! The decode at the bottom of this module is the single entry point for raw
//! extraction output. Exactly two shapes are accepted:
//!
//! 1. A bare JSON object, taken as the record itself.
//! 2. A candidate array carrying a completed `set_model_response` function
//!    response, whose `response` field is the record.
//!
//! Anything else is a [`DecodeError`]. The legacy ingester also probed for
//! pending function *calls* and for JSON embedded in text parts; those shapes
//! indicate an incomplete or malformed extraction run and are rejected here so
//! the upstream contract violation surfaces instead of being masked.

use serde_json::{Map, Value};

/// Errors from decoding raw extraction output into a [`StructuredRecord`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The raw text was not valid JSON at all
    #[error("invalid JSON in {source_id}: {source}")]
    Json {
        source_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// A candidate array was present but carried no completed
    /// `set_model_response` function response
    #[error("no completed model response found in {source_id}")]
    MissingResponse { source_id: String },

    /// The payload was neither a record object nor a candidate array
    #[error("unrecognized payload shape in {source_id}: expected object or candidate array")]
    Unrecognized { source_id: String },
}

/// One extracted college-admissions record, ready for section-wise indexing.
///
/// Sections iterate in the mapping's natural (insertion) order, which is the
/// order the extraction step emitted them in. Every non-metadata section must
/// be independently formattable; nothing here cross-references siblings.
#[derive(Debug, Clone)]
pub struct StructuredRecord {
    source_id: String,
    sections: Map<String, Value>,
}

const METADATA_SECTION: &str = "metadata";

impl StructuredRecord {
    /// Build a record from an already-extracted section mapping.
    ///
    /// `source_id` is the stable document identifier (the ingest filename in
    /// the batch pipeline) used to derive deterministic chunk ids.
    pub fn new(source_id: impl Into<String>, sections: Map<String, Value>) -> Self {
        Self {
            source_id: source_id.into(),
            sections,
        }
    }

    /// Stable identifier of the source document. Chunk ids are derived from
    /// this, so it must not change between runs for the same document.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Display name of the source file, from `metadata.source_file` when the
    /// extraction recorded one, otherwise the ingest identifier.
    pub fn source_file(&self) -> &str {
        self.sections
            .get(METADATA_SECTION)
            .and_then(|m| m.get("source_file"))
            .and_then(Value::as_str)
            .unwrap_or(&self.source_id)
    }

    /// Institution display name from `general_info.institution_name`.
    pub fn institution_name(&self) -> &str {
        self.sections
            .get("general_info")
            .and_then(|g| g.get("institution_name"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
    }

    /// Iterate every indexable section (everything except `metadata`) in the
    /// record's natural key order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.sections
            .iter()
            .filter(|(name, _)| name.as_str() != METADATA_SECTION)
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Decode raw extraction output text into a record.
    ///
    /// See the module docs for the two accepted payload shapes.
    pub fn parse(raw: &str, source_id: impl Into<String>) -> Result<Self, DecodeError> {
        let source_id = source_id.into();
        let value: Value = serde_json::from_str(raw).map_err(|source| DecodeError::Json {
            source_id: source_id.clone(),
            source,
        })?;
        Self::decode(value, source_id)
    }

    /// Decode an already-parsed JSON payload into a record.
    pub fn decode(value: Value, source_id: impl Into<String>) -> Result<Self, DecodeError> {
        let source_id = source_id.into();
        match value {
            Value::Object(sections) => Ok(Self {
                source_id,
                sections,
            }),
            Value::Array(candidates) => match extract_model_response(&candidates) {
                Some(Value::Object(sections)) => Ok(Self {
                    source_id,
                    sections,
                }),
                _ => Err(DecodeError::MissingResponse { source_id }),
            },
            _ => Err(DecodeError::Unrecognized { source_id }),
        }
    }
}

/// Pull the completed `set_model_response` payload out of a candidate array,
/// if one exists.
fn extract_model_response(candidates: &[Value]) -> Option<Value> {
    for candidate in candidates {
        let parts = candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(Value::as_array)?;
        for part in parts {
            let response = part
                .get("functionResponse")
                .filter(|fr| fr.get("name").and_then(Value::as_str) == Some("set_model_response"))
                .and_then(|fr| fr.get("response"));
            if let Some(response) = response {
                return Some(response.clone());
            }
        }
    }
    None
}
