//! JSON-over-HTTP service exposing the decoder, validator, schema client
//! and translators.
//!
//! | Method/path | Operation |
//! |-------------|-----------|
//! | `POST /v1/decode` | decode a record into its typed shape |
//! | `POST /v1/validate` | validate one record |
//! | `POST /v1/validate/stream` | validate NDJSON records, NDJSON out |
//! | `POST /v1/translate/{direction}` | run a translator |
//! | `GET /v1/schema/versions` | list schema versions |
//! | `GET /v1/schema/{version}/record` | record schema |
//! | `GET /v1/schema/{version}/defs/{key}` | one `$defs` entry |
//! | `GET /healthz` | liveness |
//!
//! Failures answer `{"error": "...", "kind": "..."}`.

use std::convert::Infallible;
use std::io;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::client::{SchemaClient, VersionsResponse};
use crate::config::Config;
use crate::decoder::decode_record;
use crate::document::Document;
use crate::error::{
    ClientError, DecodeError, DocumentError, ErrorKind, TranslateError, ValidateError,
};
use crate::record::DecodedRecord;
use crate::translate;
use crate::types::{GhCopilotConfig, ValidationOutcome};
use crate::validator::{LocalSchemas, ValidateRequest, Validator};

/// Shared state behind every handler.
pub struct AppState {
    pub config: Config,
    pub client: SchemaClient,
    pub validator: Validator,
    /// Offline schemas, used when a validate request names no schema URL.
    pub local: Option<LocalSchemas>,
    /// Cancelled on shutdown; every request works on a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build the state from a validated config.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client can't be built or `schema_dir` can't be
    /// loaded.
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let client = SchemaClient::with_timeout(&config.schema_url, config.http_timeout())?;
        let validator = Validator::with_timeout(config.http_timeout())?;
        let local = config
            .schema_dir
            .as_deref()
            .map(LocalSchemas::from_dir)
            .transpose()?;
        Ok(Self {
            config,
            client,
            validator,
            local,
            shutdown: CancellationToken::new(),
        })
    }
}

/// Errors starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An error rendered as `{error, kind}` with a status picked from the kind.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.kind)
    }

    fn body(&self) -> Value {
        json!({"error": self.message, "kind": self.kind})
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest
        | ErrorKind::MissingField
        | ErrorKind::UnsupportedVersion
        | ErrorKind::ModuleMissing
        | ErrorKind::InvalidModule
        | ErrorKind::MissingCommand
        | ErrorKind::NoConnections => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        ErrorKind::NetworkError | ErrorKind::UpstreamError | ErrorKind::ProtocolError => {
            StatusCode::BAD_GATEWAY
        }
        ErrorKind::Cancelled => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            warn!(kind = ?self.kind, error = %self.message, "request failed");
        } else {
            debug!(kind = ?self.kind, error = %self.message, "request rejected");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

macro_rules! api_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ApiError {
                fn from(err: $ty) -> Self {
                    ApiError::new(err.kind(), err.to_string())
                }
            }
        )*
    };
}

api_error_from!(
    DocumentError,
    DecodeError,
    TranslateError,
    ClientError,
    ValidateError,
);

type ApiResult<T> = Result<T, ApiError>;

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let timeout = state.config.request_timeout();
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/decode", post(decode))
        .route("/v1/validate", post(validate))
        .route("/v1/validate/stream", post(validate_stream))
        .route("/v1/translate/record-to-ghcopilot", post(record_to_ghcopilot))
        .route("/v1/translate/ghcopilot-to-record", post(ghcopilot_to_record))
        .route("/v1/translate/record-to-a2a", post(record_to_a2a))
        .route("/v1/translate/a2a-to-record", post(a2a_to_record))
        .route("/v1/translate/mcp-to-record", post(mcp_to_record))
        .route("/v1/schema/versions", get(schema_versions))
        .route("/v1/schema/:version/record", get(record_schema))
        .route("/v1/schema/:version/defs/:key", get(schema_defs))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind, serve until a shutdown signal, then cancel in-flight work.
pub async fn serve(config: Config) -> Result<(), ServerError> {
    config.validate()?;
    let addr = config.listen_addr()?;
    let state = Arc::new(AppState::new(config)?);
    let shutdown = state.shutdown.clone();
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(address = %listener.local_addr()?, "oasf-sdk server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};

        let kinds = [
            SignalKind::terminate(),
            SignalKind::hangup(),
            SignalKind::quit(),
        ];
        let mut streams = Vec::new();
        for kind in kinds {
            match unix_signal(kind) {
                Ok(stream) => streams.push(stream),
                Err(e) => warn!(error = %e, "cannot install signal handler"),
            }
        }
        if streams.is_empty() {
            std::future::pending::<()>().await;
        }
        let waits = streams.iter_mut().map(|s| Box::pin(s.recv()));
        futures::future::select_all(waits).await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received terminate signal, shutting down"),
    }
}

/// Parse a JSON body, reporting failures as `invalid_request`.
fn parse_json<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::new(ErrorKind::InvalidRequest, format!("invalid JSON body: {e}")))
}

#[derive(Deserialize)]
struct RecordBody {
    #[serde(default)]
    record: Document,
}

#[derive(Deserialize)]
struct DataBody {
    #[serde(default)]
    data: Document,
}

#[derive(Serialize)]
struct RecordResponse<T> {
    record: T,
}

#[derive(Serialize)]
struct DataResponse<T> {
    data: T,
}

async fn healthz() -> Json<Value> {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

async fn decode(body: Bytes) -> ApiResult<Json<RecordResponse<DecodedRecord>>> {
    let RecordBody { record } = parse_json(&body)?;
    let record = decode_record(&record)?;
    Ok(Json(RecordResponse { record }))
}

async fn validate(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<ValidationOutcome>> {
    let request: ValidateRequest = parse_json(&body)?;
    let cancel = state.shutdown.child_token();

    let outcome = match (&state.local, request.schema_url.trim().is_empty()) {
        (Some(local), true) => local.validate(&request.record)?,
        (_, true) => {
            state
                .validator
                .validate_record(&request.record, &state.config.schema_url, request.strict, &cancel)
                .await?
        }
        (_, false) => {
            state
                .validator
                .validate_record(&request.record, &request.schema_url, request.strict, &cancel)
                .await?
        }
    };
    Ok(Json(outcome))
}

/// Requests read from an NDJSON body as it arrives. Blank lines are
/// skipped; an unparsable line becomes an error in its place. A read
/// failure is reported once and ends the stream.
fn ndjson_requests(
    body: Body,
    default_url: String,
) -> impl Stream<Item = Result<ValidateRequest, ValidateError>> + 'static {
    let chunks = Box::pin(body.into_data_stream().map(|chunk| chunk.map_err(io::Error::other)));
    let lines = BufReader::new(StreamReader::new(chunks)).lines();

    futures::stream::unfold(Some((lines, 0usize)), move |state| {
        let default_url = default_url.clone();
        async move {
            let Some((mut lines, mut number)) = state else {
                return None;
            };
            loop {
                number += 1;
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => {
                        let parsed = parse_request_line(&line, number, &default_url);
                        return Some((parsed, Some((lines, number))));
                    }
                    Ok(None) => return None,
                    Err(e) => {
                        let err = ValidateError::InvalidRequest {
                            message: format!("line {number}: {e}"),
                        };
                        return Some((Err(err), None));
                    }
                }
            }
        }
    })
}

fn parse_request_line(
    line: &str,
    number: usize,
    default_url: &str,
) -> Result<ValidateRequest, ValidateError> {
    let mut request: ValidateRequest =
        serde_json::from_str(line).map_err(|e| ValidateError::InvalidRequest {
            message: format!("line {number}: {e}"),
        })?;
    if request.schema_url.trim().is_empty() {
        request.schema_url = default_url.to_string();
    }
    Ok(request)
}

async fn validate_stream(State(state): State<Arc<AppState>>, body: Body) -> Response {
    let requests = ndjson_requests(body, state.config.schema_url.clone());
    debug!("streaming validation");

    let cancel = state.shutdown.child_token();
    let lines = state
        .validator
        .validate_stream(requests, cancel)
        .map(|result| {
            let value = match result {
                Ok(outcome) => serde_json::to_value(outcome).unwrap_or_else(|e| {
                    ApiError::new(ErrorKind::ProtocolError, e.to_string()).body()
                }),
                Err(e) => ApiError::from(e).body(),
            };
            Ok::<_, Infallible>(format!("{value}\n"))
        });

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response()
}

async fn record_to_ghcopilot(body: Bytes) -> ApiResult<Json<DataResponse<GhCopilotConfig>>> {
    let RecordBody { record } = parse_json(&body)?;
    let data = translate::record_to_ghcopilot(&record)?;
    Ok(Json(DataResponse { data }))
}

async fn ghcopilot_to_record(body: Bytes) -> ApiResult<Json<RecordResponse<Document>>> {
    let DataBody { data } = parse_json(&body)?;
    let record = translate::ghcopilot_to_record(&data)?;
    Ok(Json(RecordResponse { record }))
}

async fn record_to_a2a(body: Bytes) -> ApiResult<Json<DataResponse<Document>>> {
    let RecordBody { record } = parse_json(&body)?;
    let data = translate::record_to_a2a(&record)?;
    Ok(Json(DataResponse { data }))
}

async fn a2a_to_record(body: Bytes) -> ApiResult<Json<RecordResponse<Document>>> {
    let DataBody { data } = parse_json(&body)?;
    let record = translate::a2a_to_record(&data)?;
    Ok(Json(RecordResponse { record }))
}

async fn mcp_to_record(body: Bytes) -> ApiResult<Json<RecordResponse<Document>>> {
    let DataBody { data } = parse_json(&body)?;
    let record = translate::mcp_to_record(&data)?;
    Ok(Json(RecordResponse { record }))
}

async fn schema_versions(State(state): State<Arc<AppState>>) -> ApiResult<Json<VersionsResponse>> {
    let cancel = state.shutdown.child_token();
    Ok(Json(state.client.get_versions(&cancel).await?))
}

async fn record_schema(
    State(state): State<Arc<AppState>>,
    Path(version): Path<String>,
) -> ApiResult<Json<Value>> {
    let cancel = state.shutdown.child_token();
    let schema = state.client.get_record_schema(Some(&version), &cancel).await?;
    Ok(Json(schema))
}

async fn schema_defs(
    State(state): State<Arc<AppState>>,
    Path((version, key)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let cancel = state.shutdown.child_token();
    let def = state
        .client
        .get_schema_key(&key, Some(&version), &cancel)
        .await?;
    Ok(Json(def))
}
