//! Core types shared by the decoder, validator and translators.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Primary MCP module name.
pub const MCP_MODULE: &str = "integration/mcp";
/// Primary A2A module name.
pub const A2A_MODULE: &str = "integration/a2a";

/// MCP module names in lookup order: primary first, then legacy.
pub const MCP_MODULE_NAMES: &[&str] = &[MCP_MODULE, "runtime/mcp"];
/// A2A module names in lookup order: primary first, then legacy.
pub const A2A_MODULE_NAMES: &[&str] = &[A2A_MODULE, "runtime/a2a"];

/// Author used when the source document names none.
pub const DEFAULT_AUTHOR: &str = "Generated by OASF SDK";

/// Recognized OASF schema versions.
///
/// Each maps onto one typed record shape, named after the API version that
/// carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    /// `v0.3.1` (also `0.3.1`) records.
    V1Alpha0,
    /// `0.7.0` records.
    V1Alpha1,
    /// `0.8.0` records.
    V1Alpha2,
    /// `1.0.0-rc.1` records.
    V1,
}

impl SchemaVersion {
    /// Match a `schema_version` string exactly.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "v0.3.1" | "0.3.1" => Some(SchemaVersion::V1Alpha0),
            "0.7.0" | "v0.7.0" => Some(SchemaVersion::V1Alpha1),
            "0.8.0" => Some(SchemaVersion::V1Alpha2),
            "1.0.0-rc.1" => Some(SchemaVersion::V1),
            _ => None,
        }
    }

    /// Canonical `schema_version` string for documents this crate builds.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::V1Alpha0 => "v0.3.1",
            SchemaVersion::V1Alpha1 => "0.7.0",
            SchemaVersion::V1Alpha2 => "0.8.0",
            SchemaVersion::V1 => "1.0.0-rc.1",
        }
    }

    /// Tag of the typed variant (`v1alpha0`, `v1alpha1`, ...).
    pub fn tag(&self) -> &'static str {
        match self {
            SchemaVersion::V1Alpha0 => "v1alpha0",
            SchemaVersion::V1Alpha1 => "v1alpha1",
            SchemaVersion::V1Alpha2 => "v1alpha2",
            SchemaVersion::V1 => "v1",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, data-carrying sub-object of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A GitHub Copilot MCP server entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServer {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A prompted secret referenced as `${input:ID}` from server env values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpInput {
    pub id: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub password: bool,
    pub description: String,
}

impl McpInput {
    /// A password-style prompt for `id`.
    pub fn prompt(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input_type: "promptString".to_string(),
            password: true,
            description: description.into(),
        }
    }
}

/// GitHub Copilot `mcp.json` configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhCopilotConfig {
    pub servers: BTreeMap<String, McpServer>,
    pub inputs: Vec<McpInput>,
}

/// Transport of an MCP 1.0 connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionType {
    Stdio,
    Sse,
    StreamableHttp,
}

impl ConnectionType {
    /// Map a remote transport name (`sse`, `streamable-http`); anything
    /// else, `stdio` included, falls back to `default`.
    pub fn from_name(name: Option<&str>, default: ConnectionType) -> Self {
        match name {
            Some("sse") => ConnectionType::Sse,
            Some("streamable-http") => ConnectionType::StreamableHttp,
            _ => default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Stdio => "stdio",
            ConnectionType::Sse => "sse",
            ConnectionType::StreamableHttp => "streamable-http",
        }
    }
}

/// An environment variable declared on a stdio connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// A single endpoint by which a client talks to an MCP server.
///
/// `stdio` connections carry `command`; `sse` and `streamable-http`
/// connections carry `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_vars: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub headers: Map<String, Value>,
}

impl Connection {
    pub fn stdio(command: impl Into<String>, args: Vec<String>, env_vars: Vec<EnvVar>) -> Self {
        Self {
            connection_type: ConnectionType::Stdio,
            command: Some(command.into()),
            args,
            env_vars,
            url: None,
            headers: Map::new(),
        }
    }

    pub fn remote(
        connection_type: ConnectionType,
        url: impl Into<String>,
        headers: Map<String, Value>,
    ) -> Self {
        Self {
            connection_type,
            command: None,
            args: Vec::new(),
            env_vars: Vec::new(),
            url: Some(url.into()),
            headers,
        }
    }
}

/// A single finding reported by the schema service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

/// Body of the schema service's validate endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResponse {
    #[serde(default)]
    pub errors: Vec<ValidationError>,
    #[serde(default)]
    pub warnings: Vec<ValidationError>,
    #[serde(default)]
    pub error_count: u64,
    #[serde(default)]
    pub warning_count: u64,
}

/// Result of validating one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_version_parse() {
        assert_eq!(SchemaVersion::parse("v0.3.1"), Some(SchemaVersion::V1Alpha0));
        assert_eq!(SchemaVersion::parse("0.3.1"), Some(SchemaVersion::V1Alpha0));
        assert_eq!(SchemaVersion::parse("0.7.0"), Some(SchemaVersion::V1Alpha1));
        assert_eq!(SchemaVersion::parse("0.8.0"), Some(SchemaVersion::V1Alpha2));
        assert_eq!(SchemaVersion::parse("1.0.0-rc.1"), Some(SchemaVersion::V1));
        assert_eq!(SchemaVersion::parse("v0.8.0"), None);
        assert_eq!(SchemaVersion::parse("1.0.0"), None);
        assert_eq!(SchemaVersion::parse(""), None);
    }

    #[test]
    fn connection_type_fallback() {
        assert_eq!(
            ConnectionType::from_name(Some("sse"), ConnectionType::Stdio),
            ConnectionType::Sse
        );
        assert_eq!(
            ConnectionType::from_name(Some("websocket"), ConnectionType::Stdio),
            ConnectionType::Stdio
        );
        assert_eq!(
            ConnectionType::from_name(Some("stdio"), ConnectionType::StreamableHttp),
            ConnectionType::StreamableHttp
        );
        assert_eq!(
            ConnectionType::from_name(None, ConnectionType::StreamableHttp),
            ConnectionType::StreamableHttp
        );
    }

    #[test]
    fn stdio_connection_serializes_without_remote_fields() {
        let conn = Connection::stdio("python", vec!["-m".into(), "weather_mcp".into()], vec![]);
        assert_eq!(
            serde_json::to_value(&conn).unwrap(),
            json!({"type": "stdio", "command": "python", "args": ["-m", "weather_mcp"]})
        );
    }

    #[test]
    fn input_serializes_type_key() {
        let input = McpInput::prompt("TOKEN", "Secret value for TOKEN");
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({
                "id": "TOKEN",
                "type": "promptString",
                "password": true,
                "description": "Secret value for TOKEN"
            })
        );
    }

    #[test]
    fn validation_response_tolerates_missing_fields() {
        let resp: ValidationResponse = serde_json::from_value(json!({
            "errors": [{"error": "required", "message": "name is required"}]
        }))
        .unwrap();
        assert_eq!(resp.errors.len(), 1);
        assert!(resp.warnings.is_empty());
        assert_eq!(resp.errors[0].attribute_path, None);
    }
}
