//! Translation between OASF records and external ecosystem formats.
//!
//! | Direction | Function |
//! |-----------|----------|
//! | record → GitHub Copilot `mcp.json` | [`record_to_ghcopilot`] |
//! | record → A2A card | [`record_to_a2a`] |
//! | A2A card → record | [`a2a_to_record`] |
//! | MCP Registry `server.json` → record | [`mcp_to_record`] |
//!
//! All translators are pure functions over [`Document`]s.

mod a2a;
mod ghcopilot;
mod mcp_registry;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::TranslateError;

pub use a2a::{a2a_annotations, a2a_to_record, record_to_a2a};
pub use ghcopilot::{ghcopilot_to_record, record_to_ghcopilot};
pub use mcp_registry::{mcp_to_record, process_headers};

static NULL: Value = Value::Null;

/// A module located in a record.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FoundModule<'a> {
    pub name: &'a str,
    pub data: &'a Value,
}

/// Find the first module whose name exactly matches one of `names`.
///
/// Names are tried in order, so the primary name wins over legacy ones
/// even when both are present.
pub(crate) fn find_module<'a>(
    record: &'a Document,
    names: &[&str],
) -> Result<FoundModule<'a>, TranslateError> {
    let root = record
        .as_object()
        .ok_or_else(|| TranslateError::InvalidRequest {
            message: "record must be a JSON object".to_string(),
        })?;

    let modules = root
        .get("modules")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for wanted in names {
        let found = modules.iter().find_map(|module| {
            let name = module.get("name").and_then(Value::as_str)?;
            (name == *wanted).then_some(FoundModule {
                name,
                data: module.get("data").unwrap_or(&NULL),
            })
        });
        if let Some(found) = found {
            return Ok(found);
        }
    }

    Err(TranslateError::ModuleMissing {
        candidates: names.iter().map(|n| n.to_string()).collect(),
    })
}

/// Require the payload's root map to hold an object at `key`.
pub(crate) fn require_object<'a>(
    payload: &'a Document,
    key: &str,
) -> Result<&'a Map<String, Value>, TranslateError> {
    if crate::document::is_empty(payload) {
        return Err(TranslateError::InvalidRequest {
            message: "payload is empty".to_string(),
        });
    }
    payload
        .get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| TranslateError::InvalidRequest {
            message: format!("payload is missing required object '{}'", key),
        })
}

/// Strip one server-name suffix, longest first.
///
/// `github-mcp-server` → `github`, `fs-server` → `fs`, `git-mcp` → `git`.
pub fn normalize_server_name(name: &str) -> &str {
    ["-mcp-server", "-server", "-mcp"]
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .filter(|stripped| !stripped.is_empty())
        .unwrap_or(name)
}

/// Current UTC time as RFC 3339 with a `Z` suffix.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Object entries of a list value; anything else yields nothing.
pub(crate) fn objects(list: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    list.and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// `${input:ID}` → `ID`.
pub(crate) fn input_reference(value: &str) -> Option<&str> {
    value
        .strip_prefix("${input:")
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|id| !id.is_empty())
}
