//! Version-aware decoding of OASF records.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::document::{self, Document};
use crate::error::DecodeError;
use crate::record::DecodedRecord;
use crate::types::SchemaVersion;

/// Read the `schema_version` string at the document root.
///
/// # Errors
///
/// Returns `DecodeError::InvalidRequest` for an empty document and
/// `DecodeError::MissingField` if the field is absent or not a string.
pub fn schema_version(doc: &Document) -> Result<&str, DecodeError> {
    if document::is_empty(doc) {
        return Err(DecodeError::InvalidRequest {
            message: "record is empty".to_string(),
        });
    }

    doc.as_object()
        .and_then(|map| map.get("schema_version"))
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::MissingField {
            field: "schema_version".to_string(),
        })
}

/// Decode a record into the typed shape matching its `schema_version`.
///
/// Only the presence of `schema_version` is checked; the typed shapes
/// accept partial records and keep unknown fields.
///
/// # Errors
///
/// Returns `DecodeError::UnsupportedVersion` when the version isn't one of
/// `v0.3.1`/`0.3.1`, `0.7.0`, `0.8.0` or `1.0.0-rc.1`, and
/// `DecodeError::Malformed` when a known field has the wrong JSON type.
pub fn decode_record(doc: &Document) -> Result<DecodedRecord, DecodeError> {
    let raw_version = schema_version(doc)?;
    let version =
        SchemaVersion::parse(raw_version).ok_or_else(|| DecodeError::UnsupportedVersion {
            version: raw_version.to_string(),
        })?;

    debug!(schema_version = raw_version, shape = version.tag(), "decoding record");

    let decoded = match version {
        SchemaVersion::V1Alpha0 => DecodedRecord::V1Alpha0(convert(doc, raw_version)?),
        SchemaVersion::V1Alpha1 => DecodedRecord::V1Alpha1(convert(doc, raw_version)?),
        SchemaVersion::V1Alpha2 => DecodedRecord::V1Alpha2(convert(doc, raw_version)?),
        SchemaVersion::V1 => DecodedRecord::V1(convert(doc, raw_version)?),
    };
    Ok(decoded)
}

/// Re-serialize the document and parse it into the target shape.
fn convert<T: DeserializeOwned>(doc: &Document, version: &str) -> Result<T, DecodeError> {
    let bytes = document::to_bytes(doc);
    serde_json::from_slice(&bytes).map_err(|source| DecodeError::Malformed {
        version: version.to_string(),
        source,
    })
}
