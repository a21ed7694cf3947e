//! MCP Registry `server.json` → OASF 1.0 record.
//!
//! Each registry package becomes one connection: stdio packages are turned
//! into a launch command (`npx`, `python -m`, `docker run`, ...), HTTP
//! packages and remotes into a URL plus headers. The original server
//! object is stashed under `mcp_data` so nothing in it is lost.

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::document::{first_str, first_value, str_field, str_or, Document};
use crate::error::TranslateError;
use crate::translate::{non_empty, now_rfc3339, objects, require_object};
use crate::types::{
    Connection, ConnectionType, EnvVar, SchemaVersion, DEFAULT_AUTHOR, MCP_MODULE,
};

const DEFAULT_NAME: &str = "generated-mcp-agent";
const DEFAULT_DESCRIPTION: &str = "Agent generated from MCP server";
const DEFAULT_VERSION: &str = "v1.0.0-rc.1";

/// Package ecosystems the registry knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegistryType {
    Npm,
    Pypi,
    Oci,
    Nuget,
    Mcpb,
    Other,
}

impl RegistryType {
    fn parse(s: Option<&str>) -> Self {
        match s.map(str::to_ascii_lowercase).as_deref() {
            Some("npm") => RegistryType::Npm,
            Some("pypi") => RegistryType::Pypi,
            Some("oci") => RegistryType::Oci,
            Some("nuget") => RegistryType::Nuget,
            Some("mcpb") => RegistryType::Mcpb,
            _ => RegistryType::Other,
        }
    }

    /// Launcher used when the package gives no runtime hint.
    fn command(&self) -> &'static str {
        match self {
            RegistryType::Npm => "npx",
            RegistryType::Pypi => "python",
            RegistryType::Oci => "docker",
            RegistryType::Nuget => "dotnet",
            RegistryType::Mcpb => "mcpb",
            RegistryType::Other => "echo",
        }
    }

    /// Launcher arguments that precede everything else.
    fn prefix_args(&self) -> &'static [&'static str] {
        match self {
            RegistryType::Pypi => &["-m"],
            RegistryType::Oci => &["run"],
            RegistryType::Nuget => &["tool", "run"],
            RegistryType::Mcpb => &["run"],
            RegistryType::Npm | RegistryType::Other => &[],
        }
    }

    /// Package reference with its version, in the launcher's syntax.
    fn push_identifier(&self, args: &mut Vec<String>, identifier: &str, version: Option<&str>) {
        match (self, version) {
            (RegistryType::Npm, Some(v)) => args.push(format!("{}@{}", identifier, v)),
            (RegistryType::Oci, Some(v)) => args.push(format!("{}:{}", identifier, v)),
            (RegistryType::Nuget, Some(v)) => {
                args.push(identifier.to_string());
                args.push("--version".to_string());
                args.push(v.to_string());
            }
            _ => args.push(identifier.to_string()),
        }
    }
}

/// Build an OASF 1.0.0-rc.1 record from an MCP Registry `{"server": {...}}` document.
///
/// # Errors
///
/// Returns `TranslateError::InvalidRequest` if there is no `server` object,
/// `TranslateError::MissingField` for a package or remote lacking a
/// required field, and `TranslateError::NoConnections` when neither
/// packages nor remotes yield a connection.
pub fn mcp_to_record(payload: &Document) -> Result<Document, TranslateError> {
    let server = require_object(payload, "server")?;

    let name = str_or(server, "name", DEFAULT_NAME);
    let description = non_empty(str_field(server, "description"));
    let version = str_or(server, "version", DEFAULT_VERSION);
    let repo_url = server
        .get("repository")
        .and_then(Value::as_object)
        .and_then(|repo| non_empty(str_field(repo, "url")));
    let author = vendor(name).unwrap_or(DEFAULT_AUTHOR);

    let mut connections = Vec::new();
    for (i, package) in objects(server.get("packages")).enumerate() {
        connections.push(package_connection(package, i)?);
    }
    for (i, remote) in objects(server.get("remotes")).enumerate() {
        connections.push(remote_connection(remote, i)?);
    }
    if connections.is_empty() {
        return Err(TranslateError::NoConnections {
            server: name.to_string(),
        });
    }
    debug!(server = name, connections = connections.len(), "translated MCP server");

    let mut module_data = Map::new();
    module_data.insert("name".into(), Value::String(name.to_string()));
    if let Some(description) = description {
        module_data.insert("description".into(), Value::String(description.to_string()));
    }
    // Connection fields are strings and string-keyed maps, so this never fails.
    let connections =
        serde_json::to_value(&connections).map_err(|e| TranslateError::InvalidModule {
            module: MCP_MODULE.to_string(),
            message: e.to_string(),
        })?;
    module_data.insert("connections".into(), connections);
    module_data.insert("mcp_data".into(), Value::Object(strip_schema(server)));

    let urls: Vec<&str> = repo_url.into_iter().collect();

    Ok(json!({
        "name": name,
        "version": version,
        "description": description.unwrap_or(DEFAULT_DESCRIPTION),
        "authors": [author],
        "created_at": now_rfc3339(),
        "schema_version": SchemaVersion::V1.as_str(),
        "skills": [],
        "domains": [],
        "locators": [{"type": "source_code", "urls": urls}],
        "modules": [{"name": MCP_MODULE, "data": Value::Object(module_data)}]
    }))
}

/// Vendor from a reverse-DNS server name: `io.github.vendor/server` → `vendor`.
fn vendor(name: &str) -> Option<&str> {
    let (prefix, _) = name.split_once('/')?;
    prefix.rsplit('.').next().filter(|v| !v.is_empty())
}

/// Copy of the server object without its `$schema` key, order kept.
fn strip_schema(server: &Map<String, Value>) -> Map<String, Value> {
    server
        .iter()
        .filter(|(key, _)| key.as_str() != "$schema")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn package_connection(
    package: &Map<String, Value>,
    index: usize,
) -> Result<Connection, TranslateError> {
    let transport = package.get("transport").and_then(Value::as_object);
    let transport_type = transport.and_then(|t| str_field(t, "type"));
    let connection_type = ConnectionType::from_name(transport_type, ConnectionType::Stdio);

    if connection_type != ConnectionType::Stdio {
        let url = transport
            .and_then(|t| non_empty(str_field(t, "url")))
            .ok_or_else(|| TranslateError::MissingField {
                path: format!("server.packages[{}].transport.url", index),
            })?;
        let headers = process_headers(transport.and_then(|t| t.get("headers")));
        return Ok(Connection::remote(connection_type, url, headers));
    }

    let registry_type = RegistryType::parse(first_str(package, &["registryType", "registry_type"]));
    let runtime_hint = first_str(package, &["runtimeHint", "runtime_hint"]);
    let identifier = first_str(package, &["identifier", "name"]).ok_or_else(|| {
        TranslateError::MissingField {
            path: format!("server.packages[{}].identifier", index),
        }
    })?;

    let command = runtime_hint.unwrap_or_else(|| registry_type.command());
    let mut args: Vec<String> = Vec::new();
    if runtime_hint.is_none() {
        args.extend(registry_type.prefix_args().iter().map(|a| a.to_string()));
    }

    for arg in objects(first_value(
        package,
        &["runtimeArguments", "runtime_arguments"],
    )) {
        push_argument(&mut args, arg);
    }

    // A runtime hint owns the invocation syntax; only registry launchers get a composed version.
    let version = match runtime_hint {
        Some(_) => None,
        None => non_empty(str_field(package, "version")),
    };
    registry_type.push_identifier(&mut args, identifier, version);

    for arg in objects(first_value(
        package,
        &["packageArguments", "package_arguments"],
    )) {
        if let Some(value) = non_empty(str_field(arg, "value")) {
            args.push(value.to_string());
        }
    }

    let env_vars = env_vars(first_value(
        package,
        &["environmentVariables", "environment_variables", "env_vars"],
    ));

    Ok(Connection::stdio(command, args, env_vars))
}

/// Runtime argument: named ones contribute their name, positional ones their value.
fn push_argument(args: &mut Vec<String>, arg: &Map<String, Value>) {
    let token = match str_field(arg, "type") {
        Some("named") => str_field(arg, "name"),
        Some("positional") => str_field(arg, "value"),
        other => {
            warn!(kind = ?other, "skipping runtime argument of unknown type");
            None
        }
    };
    if let Some(token) = non_empty(token) {
        args.push(token.to_string());
    }
}

fn env_vars(list: Option<&Value>) -> Vec<EnvVar> {
    objects(list)
        .filter_map(|var| {
            let Some(name) = non_empty(str_field(var, "name")) else {
                warn!("skipping environment variable without a name");
                return None;
            };
            let description = non_empty(str_field(var, "description"))
                .map(str::to_string)
                .unwrap_or_else(|| format!("Environment variable: {}", name));
            let default_value = str_field(var, "value")
                .or_else(|| str_field(var, "default"))
                .map(str::to_string);
            Some(EnvVar {
                name: name.to_string(),
                description,
                default_value,
            })
        })
        .collect()
}

fn remote_connection(
    remote: &Map<String, Value>,
    index: usize,
) -> Result<Connection, TranslateError> {
    let connection_type =
        ConnectionType::from_name(str_field(remote, "type"), ConnectionType::StreamableHttp);
    let url = non_empty(str_field(remote, "url")).ok_or_else(|| TranslateError::MissingField {
        path: format!("server.remotes[{}].url", index),
    })?;
    Ok(Connection::remote(
        connection_type,
        url,
        process_headers(remote.get("headers")),
    ))
}

/// Turn a registry header list into a header map.
///
/// Headers without a value get a `{snake_case_name}` placeholder for the
/// user to fill in; entries without a name are dropped.
///
/// ```
/// use oasf_sdk::translate::process_headers;
/// use serde_json::json;
///
/// let headers = json!([
///     {"name": "Authorization", "description": "bearer token"},
///     {"name": "X-Tenant", "value": "acme"}
/// ]);
/// assert_eq!(
///     serde_json::Value::Object(process_headers(Some(&headers))),
///     json!({"Authorization": "{authorization}", "X-Tenant": "acme"})
/// );
/// ```
pub fn process_headers(list: Option<&Value>) -> Map<String, Value> {
    let mut headers = Map::new();
    for header in objects(list) {
        let Some(name) = non_empty(str_field(header, "name")) else {
            warn!("dropping header without a name");
            continue;
        };
        let value = match non_empty(str_field(header, "value")) {
            Some(value) => value.to_string(),
            None => format!("{{{}}}", snake_case(name)),
        };
        headers.insert(name.to_string(), Value::String(value));
    }
    headers
}

/// `X-API-Key` → `x_api_key`, `apiKey` → `api_key`.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            let boundary = c.is_ascii_uppercase()
                && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit());
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
        prev = Some(c);
    }
    out.trim_end_matches('_').to_string()
}
