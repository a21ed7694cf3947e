//! HTTP client for the OASF schema service.
//!
//! Speaks plain `GET` to `{base}/api/versions` and
//! `{base}/schema/{version}/objects/{record|agent}`. Every call takes a
//! [`CancellationToken`]; cancelling it drops the in-flight request and
//! returns [`ClientError::Cancelled`].

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::document::Document;
use crate::error::ClientError;

/// Default timeout for HTTP requests (30 seconds).
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest upstream body excerpt carried in an error.
const BODY_EXCERPT_LEN: usize = 512;

/// Normalize a schema service URL.
///
/// Trailing slashes are trimmed and `http://` is prefixed when the URL has
/// no scheme.
///
/// ```
/// use oasf_sdk::normalize_url;
///
/// assert_eq!(normalize_url("schema.oasf.dev/"), "http://schema.oasf.dev");
/// assert_eq!(normalize_url("https://schema.oasf.dev"), "https://schema.oasf.dev");
/// ```
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if is_url(trimmed) {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Object path used for a version's record schema.
///
/// 0.3.1 predates records and publishes its top-level object as `agent`.
pub fn record_object_name(version: &str) -> &'static str {
    if version == "0.3.1" {
        "agent"
    } else {
        "record"
    }
}

/// A published schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    #[serde(default)]
    pub url: String,
}

/// Body of `GET {base}/api/versions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionsResponse {
    pub default: VersionInfo,
    #[serde(default)]
    pub versions: Vec<VersionInfo>,
}

/// Build the shared HTTP client.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|source| ClientError::Network {
            url: String::new(),
            source,
        })
}

/// Send a request and return the body of a 200 response.
///
/// Any other status becomes `ClientError::Upstream` carrying a body excerpt.
pub(crate) async fn execute(
    request: RequestBuilder,
    url: &str,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, ClientError> {
    cancellable(url, cancel, async {
        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Network {
                url: url.to_string(),
                source,
            })?;

        if status != StatusCode::OK {
            return Err(ClientError::Upstream {
                url: url.to_string(),
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }
        Ok(body.to_vec())
    })
    .await
}

/// Race `fut` against the token. An already-cancelled token wins.
async fn cancellable<T>(
    url: &str,
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled {
            url: url.to_string(),
        }),
        result = fut => result,
    }
}

fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Parse a JSON response body.
pub(crate) fn parse_body<T: serde::de::DeserializeOwned>(
    url: &str,
    body: &[u8],
) -> Result<T, ClientError> {
    serde_json::from_slice(body).map_err(|e| ClientError::Protocol {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Client for the OASF schema service.
///
/// Safe to share across tasks. The default version is fetched once and
/// then served from memory.
#[derive(Debug)]
pub struct SchemaClient {
    http: reqwest::Client,
    base_url: String,
    default_version: OnceLock<String>,
}

impl SchemaClient {
    /// Create a client for `base_url` with the default 30 s timeout.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidRequest` for an empty URL.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, HTTP_TIMEOUT)
    }

    /// Create a client with an explicit HTTP timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        if base_url.trim().is_empty() {
            return Err(ClientError::InvalidRequest {
                message: "schema URL is required".to_string(),
            });
        }
        Ok(Self {
            http: http_client(timeout)?,
            base_url: normalize_url(base_url),
            default_version: OnceLock::new(),
        })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the version listing.
    pub async fn get_versions(
        &self,
        cancel: &CancellationToken,
    ) -> Result<VersionsResponse, ClientError> {
        let url = format!("{}/api/versions", self.base_url);
        let body = self.get(&url, cancel).await?;
        parse_body(&url, &body)
    }

    /// Default schema version, cached after the first successful fetch.
    ///
    /// Concurrent first calls may both fetch; whichever stores first wins
    /// and both return the stored value.
    pub async fn get_default_version(
        &self,
        cancel: &CancellationToken,
    ) -> Result<String, ClientError> {
        if let Some(version) = self.default_version.get() {
            return Ok(version.clone());
        }

        let versions = self.get_versions(cancel).await?;
        if versions.default.version.is_empty() {
            return Err(ClientError::Protocol {
                url: format!("{}/api/versions", self.base_url),
                message: "default version is empty".to_string(),
            });
        }

        let fetched = versions.default.version;
        Ok(self.default_version.get_or_init(|| fetched).clone())
    }

    /// All published versions, in the order the service lists them.
    pub async fn list_versions(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ClientError> {
        let versions = self.get_versions(cancel).await?;
        Ok(versions.versions.into_iter().map(|v| v.version).collect())
    }

    /// Fetch the record schema for `version`, or for the default version.
    pub async fn get_record_schema(
        &self,
        version: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Document, ClientError> {
        let version = self.resolve_version(version, cancel).await?;
        let url = format!(
            "{}/schema/{}/objects/{}",
            self.base_url,
            version,
            record_object_name(&version)
        );
        let body = self.get(&url, cancel).await?;
        parse_body(&url, &body)
    }

    /// Fetch `$defs.{key}` from the record schema.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the schema has no `$defs` or no
    /// entry for `key`.
    pub async fn get_schema_key(
        &self,
        key: &str,
        version: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Document, ClientError> {
        let version = self.resolve_version(version, cancel).await?;
        let schema = self.get_record_schema(Some(&version), cancel).await?;
        extract_def(&schema, key, &version)
    }

    /// `$defs.skills` of the record schema.
    pub async fn get_skills(
        &self,
        version: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Document, ClientError> {
        self.get_schema_key("skills", version, cancel).await
    }

    /// `$defs.domains` of the record schema.
    pub async fn get_domains(
        &self,
        version: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Document, ClientError> {
        self.get_schema_key("domains", version, cancel).await
    }

    /// `$defs.modules` of the record schema.
    pub async fn get_modules(
        &self,
        version: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Document, ClientError> {
        self.get_schema_key("modules", version, cancel).await
    }

    async fn resolve_version(
        &self,
        version: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String, ClientError> {
        match version {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => self.get_default_version(cancel).await,
        }
    }

    async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, ClientError> {
        debug!(url, "fetching from schema service");
        let request = self.http.get(url).header(ACCEPT, "application/json");
        execute(request, url, cancel).await
    }
}

/// Pull `$defs.{key}` out of a schema.
fn extract_def(schema: &Document, key: &str, version: &str) -> Result<Document, ClientError> {
    let defs = schema
        .get("$defs")
        .and_then(Value::as_object)
        .ok_or_else(|| ClientError::NotFound {
            what: "$defs".to_string(),
            version: version.to_string(),
        })?;

    defs.get(key).cloned().ok_or_else(|| ClientError::NotFound {
        what: format!("$defs.{}", key),
        version: version.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VERSIONS_BODY: &str = r#"{
        "default": {"version": "0.8.0", "url": "https://schema.oasf.dev/0.8.0"},
        "versions": [
            {"version": "0.7.0", "url": "https://schema.oasf.dev/0.7.0"},
            {"version": "0.8.0", "url": "https://schema.oasf.dev/0.8.0"}
        ]
    }"#;

    #[test]
    fn normalize_url_variants() {
        assert_eq!(normalize_url("http://x.dev/"), "http://x.dev");
        assert_eq!(normalize_url("https://x.dev///"), "https://x.dev");
        assert_eq!(normalize_url("x.dev"), "http://x.dev");
        assert_eq!(normalize_url("localhost:8080/"), "http://localhost:8080");
    }

    #[test]
    fn record_object_for_versions() {
        assert_eq!(record_object_name("0.3.1"), "agent");
        assert_eq!(record_object_name("0.7.0"), "record");
        assert_eq!(record_object_name("1.0.0-rc.1"), "record");
    }

    #[test]
    fn empty_base_url_rejected() {
        let err = SchemaClient::new("  ").unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest { .. }));
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let body = "x".repeat(BODY_EXCERPT_LEN + 10);
        let out = excerpt(body.as_bytes());
        assert!(out.ends_with("..."));
        assert_eq!(out.len(), BODY_EXCERPT_LEN + 3);
        assert_eq!(excerpt(b"  short  "), "short");
    }

    #[test]
    fn extract_def_missing_key() {
        let schema = json!({"$defs": {"skills": {"type": "array"}}});
        assert_eq!(
            extract_def(&schema, "skills", "0.8.0").unwrap(),
            json!({"type": "array"})
        );
        let err = extract_def(&schema, "domains", "0.8.0").unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
        let err = extract_def(&json!({}), "skills", "0.8.0").unwrap_err();
        assert_eq!(err.to_string(), "$defs not found in schema 0.8.0");
    }

    #[tokio::test]
    async fn default_version_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/versions")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(VERSIONS_BODY)
            .expect(1)
            .create_async()
            .await;

        let client = SchemaClient::new(&server.url()).unwrap();
        let cancel = CancellationToken::new();
        assert_eq!(client.get_default_version(&cancel).await.unwrap(), "0.8.0");
        assert_eq!(client.get_default_version(&cancel).await.unwrap(), "0.8.0");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_versions_in_order() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/versions")
            .with_status(200)
            .with_body(VERSIONS_BODY)
            .create_async()
            .await;

        let client = SchemaClient::new(&format!("{}/", server.url())).unwrap();
        let versions = client
            .list_versions(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(versions, vec!["0.7.0", "0.8.0"]);
    }

    #[tokio::test]
    async fn record_schema_paths() {
        let mut server = mockito::Server::new_async().await;
        let agent = server
            .mock("GET", "/schema/0.3.1/objects/agent")
            .with_status(200)
            .with_body(r#"{"title": "agent"}"#)
            .create_async()
            .await;
        let record = server
            .mock("GET", "/schema/0.8.0/objects/record")
            .with_status(200)
            .with_body(r#"{"title": "record"}"#)
            .create_async()
            .await;

        let client = SchemaClient::new(&server.url()).unwrap();
        let cancel = CancellationToken::new();
        let schema = client
            .get_record_schema(Some("0.3.1"), &cancel)
            .await
            .unwrap();
        assert_eq!(schema["title"], "agent");
        let schema = client
            .get_record_schema(Some("0.8.0"), &cancel)
            .await
            .unwrap();
        assert_eq!(schema["title"], "record");

        agent.assert_async().await;
        record.assert_async().await;
    }

    #[tokio::test]
    async fn schema_key_uses_default_version() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/versions")
            .with_status(200)
            .with_body(VERSIONS_BODY)
            .create_async()
            .await;
        server
            .mock("GET", "/schema/0.8.0/objects/record")
            .with_status(200)
            .with_body(r#"{"$defs": {"skills": {"enum": ["a", "b"]}}}"#)
            .create_async()
            .await;

        let client = SchemaClient::new(&server.url()).unwrap();
        let cancel = CancellationToken::new();
        let skills = client.get_skills(None, &cancel).await.unwrap();
        assert_eq!(skills, json!({"enum": ["a", "b"]}));

        let err = client.get_modules(None, &cancel).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
    }

    #[tokio::test]
    async fn non_200_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/versions")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let client = SchemaClient::new(&server.url()).unwrap();
        let err = client
            .get_versions(&CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            ClientError::Upstream { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/versions")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let client = SchemaClient::new(&server.url()).unwrap();
        let err = client
            .get_default_version(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Protocol { .. }));
    }

    #[tokio::test]
    async fn cancelled_before_send() {
        let client = SchemaClient::new("http://127.0.0.1:9").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client.get_versions(&cancel).await.unwrap_err();
        assert!(matches!(err, ClientError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        // Port 9 (discard) is closed on test hosts.
        let client = SchemaClient::new("http://127.0.0.1:9").unwrap();
        let err = client
            .get_versions(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Network { .. }));
    }
}
