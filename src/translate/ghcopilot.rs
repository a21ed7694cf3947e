//! OASF record → GitHub Copilot MCP configuration.

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::document::{str_field, str_list, Document};
use crate::error::TranslateError;
use crate::translate::{find_module, input_reference, non_empty, normalize_server_name};
use crate::types::{GhCopilotConfig, McpInput, McpServer, MCP_MODULE_NAMES};

/// Shape of the MCP module's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    /// 1.0: `{name, connections[]}`.
    Connections,
    /// 0.7 and 0.8: `{servers[]}`.
    Servers,
}

fn detect_dialect(data: &Map<String, Value>) -> Option<Dialect> {
    let has_name = data.get("name").is_some_and(Value::is_string);
    let has_connections = data.get("connections").is_some_and(Value::is_array);
    if has_name && has_connections {
        Some(Dialect::Connections)
    } else if data.get("servers").is_some_and(Value::is_array) {
        Some(Dialect::Servers)
    } else {
        None
    }
}

/// Inputs in first-seen order, unique by id.
#[derive(Debug, Default)]
struct Inputs {
    inputs: Vec<McpInput>,
    seen: HashSet<String>,
}

impl Inputs {
    fn register(&mut self, id: &str, description: Option<&str>) {
        if !self.seen.insert(id.to_string()) {
            debug!(id, "dropping duplicate input");
            return;
        }
        let description = match description {
            Some(d) if !d.trim().is_empty() => d.to_string(),
            _ => format!("Secret value for {}", id),
        };
        self.inputs.push(McpInput::prompt(id, description));
    }

    /// Register an input if `value` is an `${input:ID}` reference.
    fn register_reference(&mut self, value: &str, description: Option<&str>) {
        if let Some(id) = input_reference(value) {
            self.register(id, description);
        }
    }
}

/// Build a GitHub Copilot `mcp.json` configuration from a record's MCP module.
///
/// The module is looked up as `integration/mcp`, then `runtime/mcp`. Both
/// the 1.0 `connections` layout and the 0.7/0.8 `servers` layout are
/// understood; only stdio servers are emitted.
///
/// # Errors
///
/// Returns `TranslateError::ModuleMissing` if the record has no MCP module,
/// `TranslateError::InvalidModule` if its data matches neither layout, and
/// `TranslateError::MissingCommand` for a stdio server without a command.
pub fn record_to_ghcopilot(record: &Document) -> Result<GhCopilotConfig, TranslateError> {
    let module = find_module(record, MCP_MODULE_NAMES)?;
    let data = module
        .data
        .as_object()
        .ok_or_else(|| TranslateError::InvalidModule {
            module: module.name.to_string(),
            message: "module data must be an object".to_string(),
        })?;

    let dialect = detect_dialect(data).ok_or_else(|| TranslateError::InvalidModule {
        module: module.name.to_string(),
        message: "expected either name and connections, or servers".to_string(),
    })?;
    debug!(module = module.name, ?dialect, "translating MCP module");

    let mut servers = BTreeMap::new();
    let mut inputs = Inputs::default();
    match dialect {
        Dialect::Connections => from_connections(data, &mut servers, &mut inputs)?,
        Dialect::Servers => from_servers(data, &mut servers, &mut inputs)?,
    }

    Ok(GhCopilotConfig {
        servers,
        inputs: inputs.inputs,
    })
}

fn from_connections(
    data: &Map<String, Value>,
    servers: &mut BTreeMap<String, McpServer>,
    inputs: &mut Inputs,
) -> Result<(), TranslateError> {
    let name = str_field(data, "name").unwrap_or_default();
    let connections = data
        .get("connections")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let Some(stdio) = connections
        .iter()
        .filter_map(Value::as_object)
        .find(|c| str_field(c, "type") == Some("stdio"))
    else {
        warn!(server = name, "no stdio connection; GitHub Copilot supports stdio only");
        return Ok(());
    };

    let command = non_empty(str_field(stdio, "command")).ok_or_else(|| {
        TranslateError::MissingCommand {
            server: name.to_string(),
        }
    })?;

    let mut env = BTreeMap::new();
    for var in stdio
        .get("env_vars")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
    {
        let Some(var_name) = non_empty(str_field(var, "name")) else {
            warn!(server = name, "skipping env var without a name");
            continue;
        };
        let description = str_field(var, "description");

        match non_empty(str_field(var, "default_value")) {
            Some(default) => {
                inputs.register_reference(default, description);
                env.insert(var_name.to_string(), default.to_string());
            }
            None => {
                inputs.register(var_name, description);
                env.insert(var_name.to_string(), format!("${{input:{}}}", var_name));
            }
        }
    }

    servers.insert(
        normalize_server_name(name).to_string(),
        McpServer {
            command: command.to_string(),
            args: str_list(stdio, "args"),
            env,
        },
    );
    Ok(())
}

fn from_servers(
    data: &Map<String, Value>,
    servers: &mut BTreeMap<String, McpServer>,
    inputs: &mut Inputs,
) -> Result<(), TranslateError> {
    let entries = data
        .get("servers")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for server in entries.iter().filter_map(Value::as_object) {
        let Some(name) = non_empty(str_field(server, "name")) else {
            debug!("skipping server entry without a name");
            continue;
        };
        let command = non_empty(str_field(server, "command")).ok_or_else(|| {
            TranslateError::MissingCommand {
                server: name.to_string(),
            }
        })?;

        let key = normalize_server_name(name).to_string();
        if servers.contains_key(&key) {
            warn!(server = name, key = %key, "duplicate server name; keeping the first");
            continue;
        }

        let args = str_list(server, "args");
        let mut env = BTreeMap::new();

        // `-e VAR` is docker's env passthrough: keep it in args and prompt for VAR.
        let mut tokens = args.iter().peekable();
        while let Some(token) = tokens.next() {
            if token != "-e" {
                continue;
            }
            if let Some(var) = tokens.next_if(|next| !next.contains('=') && !next.starts_with('-'))
            {
                inputs.register(var, None);
                env.insert(var.clone(), format!("${{input:{}}}", var));
            }
        }

        if let Some(explicit) = server.get("env").and_then(Value::as_object) {
            for (key, value) in explicit {
                let Some(value) = value.as_str() else {
                    warn!(server = name, key = %key, "skipping non-string env value");
                    continue;
                };
                inputs.register_reference(value, None);
                env.insert(key.clone(), value.to_string());
            }
        }

        servers.insert(
            key,
            McpServer {
                command: command.to_string(),
                args,
                env,
            },
        );
    }
    Ok(())
}

/// GitHub Copilot configuration → OASF record.
///
/// # Errors
///
/// Always returns `TranslateError::Unimplemented`.
pub fn ghcopilot_to_record(_config: &Document) -> Result<Document, TranslateError> {
    Err(TranslateError::Unimplemented {
        operation: "GHCopilotToRecord".to_string(),
    })
}
