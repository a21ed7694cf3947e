//! Error types for OASF decoding, validation and translation.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification shared by every error in the crate.
///
/// The RPC layer and the CLI only look at the kind; the concrete error
/// carries the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    MissingField,
    UnsupportedVersion,
    ModuleMissing,
    InvalidModule,
    MissingCommand,
    NoConnections,
    NetworkError,
    UpstreamError,
    ProtocolError,
    NotFound,
    Cancelled,
    Unimplemented,
    Io,
}

impl ErrorKind {
    /// Returns the CLI exit code for this kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::NetworkError
            | ErrorKind::UpstreamError
            | ErrorKind::Cancelled
            | ErrorKind::Io => 3,
            _ => 2,
        }
    }
}

/// Errors while parsing or shaping a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a JSON object at the document root, got {actual}")]
    NotAnObject { actual: String },
}

impl DocumentError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidRequest
    }
}

/// Errors during version-aware record decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("{field} field is missing")]
    MissingField { field: String },

    #[error("unsupported OASF version: {version}")]
    UnsupportedVersion { version: String },

    #[error("failed to decode {version} record: {source}")]
    Malformed {
        version: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::InvalidRequest { .. } | DecodeError::Malformed { .. } => {
                ErrorKind::InvalidRequest
            }
            DecodeError::MissingField { .. } => ErrorKind::MissingField,
            DecodeError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

/// Errors while translating between OASF records and external formats.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("missing required field at {path}")]
    MissingField { path: String },

    #[error("no module named {} found in record", candidates.join(" or "))]
    ModuleMissing { candidates: Vec<String> },

    #[error("invalid module {module}: {message}")]
    InvalidModule { module: String, message: String },

    #[error("MCP server '{server}' has no command")]
    MissingCommand { server: String },

    #[error("MCP server '{server}' declares no usable packages or remotes")]
    NoConnections { server: String },

    #[error("{operation} is not implemented")]
    Unimplemented { operation: String },
}

impl TranslateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslateError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            TranslateError::MissingField { .. } => ErrorKind::MissingField,
            TranslateError::ModuleMissing { .. } => ErrorKind::ModuleMissing,
            TranslateError::InvalidModule { .. } => ErrorKind::InvalidModule,
            TranslateError::MissingCommand { .. } => ErrorKind::MissingCommand,
            TranslateError::NoConnections { .. } => ErrorKind::NoConnections,
            TranslateError::Unimplemented { .. } => ErrorKind::Unimplemented,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

/// Errors talking to the OASF schema service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("failed to reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("schema service returned {status} for {url}: {body}")]
    Upstream {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {url}: {message}")]
    Protocol { url: String, message: String },

    #[error("{what} not found in schema {version}")]
    NotFound { what: String, version: String },

    #[error("request to {url} was cancelled")]
    Cancelled { url: String },
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            ClientError::Network { .. } => ErrorKind::NetworkError,
            ClientError::Upstream { .. } => ErrorKind::UpstreamError,
            ClientError::Protocol { .. } => ErrorKind::ProtocolError,
            ClientError::NotFound { .. } => ErrorKind::NotFound,
            ClientError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

/// Errors during record validation.
///
/// Validation findings are not errors: they travel in
/// [`ValidationOutcome`](crate::ValidationOutcome).
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid schema {name}: {message}")]
    InvalidSchema { name: String, message: String },
}

impl ValidateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidateError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            ValidateError::Client(e) => e.kind(),
            ValidateError::Decode(e) => e.kind(),
            ValidateError::ReadError { .. } => ErrorKind::Io,
            ValidateError::InvalidSchema { .. } => ErrorKind::ProtocolError,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_messages() {
        let err = DecodeError::UnsupportedVersion {
            version: "v99.99.99".into(),
        };
        assert_eq!(err.to_string(), "unsupported OASF version: v99.99.99");

        let err = DecodeError::MissingField {
            field: "schema_version".into(),
        };
        assert_eq!(err.to_string(), "schema_version field is missing");
        assert_eq!(err.kind(), ErrorKind::MissingField);
    }

    #[test]
    fn module_missing_lists_candidates() {
        let err = TranslateError::ModuleMissing {
            candidates: vec!["integration/mcp".into(), "runtime/mcp".into()],
        };
        assert_eq!(
            err.to_string(),
            "no module named integration/mcp or runtime/mcp found in record"
        );
        assert_eq!(err.kind(), ErrorKind::ModuleMissing);
    }

    #[test]
    fn exit_codes() {
        let err = ClientError::Upstream {
            url: "http://x".into(),
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.exit_code(), 3);

        let err = TranslateError::MissingCommand {
            server: "github".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = ValidateError::from(DecodeError::MissingField {
            field: "schema_version".into(),
        });
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert_eq!(err.exit_code(), 2);
    }
}
