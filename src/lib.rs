//! OASF SDK
//!
//! Tooling for Open Agentic Schema Framework records: version-aware
//! decoding, validation against the OASF schema service, and translation
//! to and from GitHub Copilot MCP configs, A2A agent cards and MCP
//! Registry server manifests.
//!
//! # Example
//!
//! ```
//! use oasf_sdk::{decode_record, translate, DecodedRecord};
//! use serde_json::json;
//!
//! let record = json!({
//!     "schema_version": "0.8.0",
//!     "name": "weather-agent",
//!     "modules": [{
//!         "name": "integration/mcp",
//!         "data": {
//!             "servers": [{
//!                 "name": "weather-mcp-server",
//!                 "command": "python",
//!                 "args": ["-m", "weather_mcp"]
//!             }]
//!         }
//!     }]
//! });
//!
//! let decoded = decode_record(&record).unwrap();
//! assert!(matches!(decoded, DecodedRecord::V1Alpha2(_)));
//!
//! let config = translate::record_to_ghcopilot(&record).unwrap();
//! assert_eq!(config.servers["weather"].command, "python");
//! ```
//!
//! # Schema versions
//!
//! | `schema_version` | Typed shape |
//! |------------------|-------------|
//! | `v0.3.1`, `0.3.1` | `v1alpha0` |
//! | `0.7.0` | `v1alpha1` |
//! | `0.8.0` | `v1alpha2` |
//! | `1.0.0-rc.1` | `v1` |

mod client;
mod config;
mod decoder;
pub mod document;
mod error;
mod record;
pub mod server;
pub mod translate;
mod types;
mod validator;

pub use client::{
    is_url, normalize_url, record_object_name, SchemaClient, VersionInfo, VersionsResponse,
};
pub use config::{Config, ConfigError, DEFAULT_LISTEN_ADDRESS, DEFAULT_SCHEMA_URL};
pub use decoder::{decode_record, schema_version};
pub use document::Document;
pub use error::{ClientError, DecodeError, DocumentError, ErrorKind, TranslateError, ValidateError};
pub use record::{
    DecodedRecord, Domain, Extension, Locator, RecordV1, RecordV1Alpha0, RecordV1Alpha1,
    RecordV1Alpha2, Skill,
};
pub use server::{serve, ServerError};
pub use types::{
    Connection, ConnectionType, EnvVar, GhCopilotConfig, McpInput, McpServer, Module,
    SchemaVersion, ValidationError, ValidationOutcome, ValidationResponse, A2A_MODULE,
    A2A_MODULE_NAMES, DEFAULT_AUTHOR, MCP_MODULE, MCP_MODULE_NAMES,
};
pub use validator::{fold_response, format_finding, LocalSchemas, ValidateRequest, Validator};
