//! Record validation.
//!
//! Remote validation posts the record to the schema service and folds the
//! findings into a [`ValidationOutcome`]. Local validation runs the same
//! record against JSON Schema files kept on disk, one per version.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{execute, http_client, normalize_url, parse_body, HTTP_TIMEOUT};
use crate::decoder::schema_version;
use crate::document::{self, Document};
use crate::error::{ClientError, DecodeError, ValidateError};
use crate::types::{ValidationError, ValidationOutcome, ValidationResponse};

/// One validation request, as carried by the streaming API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub record: Document,
    #[serde(default)]
    pub schema_url: String,
    #[serde(default = "default_strict")]
    pub strict: bool,
}

fn default_strict() -> bool {
    true
}

/// Format a finding as `{prefix} at {path}: {message}`.
///
/// `constraint_failed` findings also carry their constraint as JSON.
pub fn format_finding(finding: &ValidationError, prefix: &str) -> String {
    let mut out = match finding.attribute_path.as_deref() {
        Some(path) if !path.is_empty() => format!("{} at {}: {}", prefix, path, finding.message),
        _ => format!("{}: {}", prefix, finding.message),
    };

    if finding.error == "constraint_failed" {
        if let Some(constraint) = &finding.constraint {
            let json = serde_json::to_string(constraint).unwrap_or_default();
            out.push_str(&format!(" Constraint: {}", json));
        }
    }
    out
}

/// Fold a service response into an outcome.
///
/// In strict mode warnings count against validity and are reported in
/// `errors` after the errors proper; otherwise they are returned apart
/// and only errors decide validity.
pub fn fold_response(response: &ValidationResponse, strict: bool) -> ValidationOutcome {
    let errors: Vec<String> = response
        .errors
        .iter()
        .map(|e| format_finding(e, "Validation Error"))
        .collect();
    let warnings: Vec<String> = response
        .warnings
        .iter()
        .map(|w| format_finding(w, "Validation Warning"))
        .collect();

    if strict {
        let is_valid = errors.is_empty() && warnings.is_empty();
        let mut combined = errors;
        combined.extend(warnings);
        ValidationOutcome {
            is_valid,
            errors: combined,
            warnings: Vec::new(),
        }
    } else {
        ValidationOutcome {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Validates records against the schema service.
#[derive(Debug, Clone)]
pub struct Validator {
    http: reqwest::Client,
}

impl Validator {
    /// Create a validator with the default 30 s timeout.
    pub fn new() -> Result<Self, ClientError> {
        Self::with_timeout(HTTP_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: http_client(timeout)?,
        })
    }

    /// Validate one record against the service at `schema_url`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidRequest` for an empty schema URL, a
    /// `DecodeError` when the record has no `schema_version`, and the
    /// client's network/upstream/protocol errors unchanged. Validation
    /// findings are never errors.
    pub async fn validate_record(
        &self,
        record: &Document,
        schema_url: &str,
        strict: bool,
        cancel: &CancellationToken,
    ) -> Result<ValidationOutcome, ValidateError> {
        if schema_url.trim().is_empty() {
            return Err(ClientError::InvalidRequest {
                message: "schema URL is required".to_string(),
            }
            .into());
        }
        let version = schema_version(record)?;

        let url = format!(
            "{}/api/{}/validate/object/record",
            normalize_url(schema_url),
            version
        );
        debug!(%url, strict, "validating record");

        let request = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(document::to_bytes(record));
        let body = execute(request, &url, cancel).await?;
        let response: ValidationResponse = parse_body(&url, &body)?;

        let outcome = fold_response(&response, strict);
        if !outcome.is_valid {
            debug!(
                errors = response.errors.len(),
                warnings = response.warnings.len(),
                "record failed validation"
            );
        }
        Ok(outcome)
    }

    /// Validate a stream of requests, one outcome per request, in order.
    ///
    /// Requests are processed one at a time. An item that is already an
    /// error (say, an unparsable input line) comes out as that error in its
    /// place. Cancelling the token fails the request in flight with
    /// `Cancelled` and ends the stream.
    pub fn validate_stream<S>(
        &self,
        requests: S,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<ValidationOutcome, ValidateError>> + 'static
    where
        S: Stream<Item = Result<ValidateRequest, ValidateError>> + 'static,
    {
        let validator = self.clone();
        requests
            .take_until(cancel.clone().cancelled_owned())
            .then(move |request| {
                let validator = validator.clone();
                let cancel = cancel.clone();
                async move {
                    let request = request?;
                    validator
                        .validate_record(
                            &request.record,
                            &request.schema_url,
                            request.strict,
                            &cancel,
                        )
                        .await
                }
            })
    }
}

/// JSON Schemas for offline validation, keyed by schema version.
///
/// The key is the exact `schema_version` string, so `0.3.1` and `v0.3.1`
/// are distinct entries.
#[derive(Default)]
pub struct LocalSchemas {
    schemas: BTreeMap<String, jsonschema::Validator>,
}

impl LocalSchemas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` file in `dir`, keyed by file stem.
    ///
    /// # Errors
    ///
    /// Returns `ValidateError::ReadError` if the directory or a file can't be
    /// read, and `ValidateError::InvalidSchema` for files that aren't valid
    /// JSON Schema.
    pub fn from_dir(dir: &Path) -> Result<Self, ValidateError> {
        let entries = std::fs::read_dir(dir).map_err(|source| ValidateError::ReadError {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut schemas = Self::new();
        for entry in entries {
            let entry = entry.map_err(|source| ValidateError::ReadError {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(version) = path.file_stem().and_then(|s| s.to_str()) else {
                warn!(path = %path.display(), "skipping schema with non UTF-8 name");
                continue;
            };

            let content =
                std::fs::read_to_string(&path).map_err(|source| ValidateError::ReadError {
                    path: path.clone(),
                    source,
                })?;
            let schema =
                document::parse_str(&content).map_err(|e| ValidateError::InvalidSchema {
                    name: version.to_string(),
                    message: e.to_string(),
                })?;
            schemas.insert(version, &schema)?;
        }

        debug!(
            dir = %dir.display(),
            versions = ?schemas.versions(),
            "loaded local schemas"
        );
        Ok(schemas)
    }

    /// Compile and register a schema for `version`.
    pub fn insert(&mut self, version: &str, schema: &Value) -> Result<(), ValidateError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| ValidateError::InvalidSchema {
                name: version.to_string(),
                message: e.to_string(),
            })?;
        self.schemas.insert(version.to_string(), validator);
        Ok(())
    }

    /// Versions with a registered schema.
    pub fn versions(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }

    /// Validate `record` against the schema registered for its version.
    ///
    /// # Errors
    ///
    /// Returns a `DecodeError` when the record has no `schema_version` or no
    /// schema is registered for it.
    pub fn validate(&self, record: &Document) -> Result<ValidationOutcome, ValidateError> {
        let version = schema_version(record)?;
        let validator =
            self.schemas
                .get(version)
                .ok_or_else(|| DecodeError::UnsupportedVersion {
                    version: version.to_string(),
                })?;

        let errors: Vec<String> = validator
            .iter_errors(record)
            .map(|e| {
                let finding = ValidationError {
                    error: "schema".to_string(),
                    message: e.to_string(),
                    attribute_path: Some(e.instance_path.to_string()),
                    ..Default::default()
                };
                format_finding(&finding, "Validation Error")
            })
            .collect();

        Ok(ValidationOutcome {
            is_valid: errors.is_empty(),
            errors,
            warnings: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn finding(error: &str, message: &str, path: Option<&str>) -> ValidationError {
        ValidationError {
            error: error.to_string(),
            message: message.to_string(),
            attribute_path: path.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn format_with_and_without_path() {
        let with_path = finding("required", "name is required", Some("name"));
        assert_eq!(
            format_finding(&with_path, "Validation Error"),
            "Validation Error at name: name is required"
        );

        let without = finding("required", "name is required", None);
        assert_eq!(
            format_finding(&without, "Validation Warning"),
            "Validation Warning: name is required"
        );
    }

    #[test]
    fn format_constraint_failed() {
        let mut f = finding("constraint_failed", "need one", Some("data.servers[0]"));
        f.constraint = json!({"at_least_one": ["url", "command"]})
            .as_object()
            .cloned();
        let out = format_finding(&f, "Validation Error");
        assert!(out.contains("Validation Error at data.servers[0]:"));
        assert!(out.contains(r#"Constraint: {"at_least_one":["url","command"]}"#));
    }

    #[test]
    fn constraint_ignored_for_other_errors() {
        let mut f = finding("required", "msg", None);
        f.constraint = json!({"x": 1}).as_object().cloned();
        assert!(!format_finding(&f, "Validation Error").contains("Constraint"));
    }

    #[test]
    fn strict_counts_warnings() {
        let response = ValidationResponse {
            warnings: vec![finding("deprecated", "old field", Some("extensions"))],
            warning_count: 1,
            ..Default::default()
        };

        let strict = fold_response(&response, true);
        assert!(!strict.is_valid);
        assert_eq!(strict.errors.len(), 1);
        assert!(strict.warnings.is_empty());

        let lenient = fold_response(&response, false);
        assert!(lenient.is_valid);
        assert!(lenient.errors.is_empty());
        assert_eq!(lenient.warnings.len(), 1);
    }

    #[test]
    fn strict_orders_errors_before_warnings() {
        let response = ValidationResponse {
            errors: vec![finding("required", "e", None)],
            warnings: vec![finding("deprecated", "w", None)],
            ..Default::default()
        };
        let outcome = fold_response(&response, true);
        assert_eq!(
            outcome.errors,
            vec!["Validation Error: e", "Validation Warning: w"]
        );
    }

    #[test]
    fn local_schema_selected_by_exact_version() {
        let mut schemas = LocalSchemas::new();
        schemas
            .insert(
                "0.8.0",
                &json!({
                    "type": "object",
                    "required": ["name"],
                    "properties": {"name": {"type": "string"}}
                }),
            )
            .unwrap();

        let ok = schemas
            .validate(&json!({"schema_version": "0.8.0", "name": "x"}))
            .unwrap();
        assert!(ok.is_valid);

        let bad = schemas
            .validate(&json!({"schema_version": "0.8.0", "name": 5}))
            .unwrap();
        assert!(!bad.is_valid);
        assert!(bad.errors[0].starts_with("Validation Error at /name:"));

        let err = schemas
            .validate(&json!({"schema_version": "v0.8.0"}))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported OASF version: v0.8.0"));
    }

    #[test]
    fn local_schemas_from_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("0.7.0.json"), r#"{"type": "object"}"#).unwrap();
        std::fs::write(dir.path().join("v0.3.1.json"), r#"{"type": "object"}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let schemas = LocalSchemas::from_dir(dir.path()).unwrap();
        assert_eq!(schemas.versions(), vec!["0.7.0", "v0.3.1"]);
    }

    #[test]
    fn local_schemas_reject_bad_json() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("0.7.0.json"), "not json").unwrap();
        let result = LocalSchemas::from_dir(dir.path());
        assert!(matches!(result, Err(ValidateError::InvalidSchema { .. })));
    }

    #[tokio::test]
    async fn empty_schema_url_rejected() {
        let validator = Validator::new().unwrap();
        let err = validator
            .validate_record(
                &json!({"schema_version": "0.8.0"}),
                "",
                true,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ValidateError::Client(ClientError::InvalidRequest { .. })
        ));
    }
}
