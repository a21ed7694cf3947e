//! OASF SDK CLI
//!
//! Decode, validate and translate OASF records, query the schema service,
//! or run the JSON-over-HTTP server.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use oasf_sdk::{
    decode_record, document, serve, translate, Config, Document, LocalSchemas, SchemaClient,
    ValidationOutcome, Validator, DEFAULT_SCHEMA_URL,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "oasf-sdk")]
#[command(about = "Decode, validate and translate OASF agent records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the JSON-over-HTTP server
    Server {
        /// TOML config file
        #[arg(long, env = "OASF_SDK_CONFIG")]
        config: Option<PathBuf>,

        /// Address to listen on (default: 0.0.0.0:31234)
        #[arg(long, env = "OASF_SDK_LISTEN_ADDRESS")]
        listen_address: Option<String>,

        /// Schema service base URL
        #[arg(long, env = "OASF_SDK_SCHEMA_URL")]
        schema_url: Option<String>,

        /// Directory of `{version}.json` schemas for offline validation
        #[arg(long, env = "OASF_SDK_SCHEMA_DIR")]
        schema_dir: Option<PathBuf>,

        /// Timeout for schema service calls, in seconds
        #[arg(long, env = "OASF_SDK_HTTP_TIMEOUT_SECS")]
        http_timeout_secs: Option<u64>,

        /// Timeout for a whole request, in seconds
        #[arg(long, env = "OASF_SDK_REQUEST_TIMEOUT_SECS")]
        request_timeout_secs: Option<u64>,
    },

    /// Decode a record into the typed shape for its schema version
    Decode {
        /// Record file (`-` for stdin)
        file: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a record against the schema service or local schemas
    Validate {
        /// Record file (`-` for stdin)
        file: PathBuf,

        /// Schema service base URL
        #[arg(
            long,
            env = "OASF_SDK_SCHEMA_URL",
            default_value = DEFAULT_SCHEMA_URL,
            conflicts_with = "schema_dir"
        )]
        schema_url: String,

        /// Validate offline against `{version}.json` files in this directory
        #[arg(long, env = "OASF_SDK_SCHEMA_DIR")]
        schema_dir: Option<PathBuf>,

        /// Strict mode: warnings count as errors (default: true)
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        strict: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Translate between OASF records and other formats
    Translate {
        /// Translation to run
        #[arg(value_enum)]
        direction: Direction,

        /// Input file (`-` for stdin)
        file: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Query the schema service
    Schema {
        /// Schema service base URL
        #[arg(long, env = "OASF_SDK_SCHEMA_URL", default_value = DEFAULT_SCHEMA_URL)]
        schema_url: String,

        #[command(subcommand)]
        command: SchemaCommand,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    /// Record to GitHub Copilot mcp.json
    ToGhcopilot,
    /// Record to A2A card
    ToA2a,
    /// A2A card to record
    FromA2a,
    /// MCP Registry server.json to record
    FromMcp,
}

#[derive(Subcommand)]
enum SchemaCommand {
    /// List published schema versions
    Versions,

    /// Print the record schema
    Record {
        /// Schema version (default: the service's default)
        #[arg(long = "schema-version")]
        version: Option<String>,
    },

    /// Print one `$defs` entry of the record schema
    Defs {
        /// Key under `$defs` (e.g. skills, domains, modules)
        key: String,

        /// Schema version (default: the service's default)
        #[arg(long = "schema-version")]
        version: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Commands::Server { .. }));

    let result = match cli.command {
        Commands::Server {
            config,
            listen_address,
            schema_url,
            schema_dir,
            http_timeout_secs,
            request_timeout_secs,
        } => {
            run_server(ServerArgs {
                config,
                listen_address,
                schema_url,
                schema_dir,
                http_timeout_secs,
                request_timeout_secs,
            })
            .await
        }

        Commands::Decode { file, pretty } => run_decode(&file, pretty),

        Commands::Validate {
            file,
            schema_url,
            schema_dir,
            strict,
            json,
        } => run_validate(&file, &schema_url, schema_dir.as_deref(), strict, json).await,

        Commands::Translate {
            direction,
            file,
            pretty,
        } => run_translate(direction, &file, pretty),

        Commands::Schema {
            schema_url,
            command,
        } => run_schema(&schema_url, command).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(server: bool) {
    let default = if server { "info,oasf_sdk=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

struct ServerArgs {
    config: Option<PathBuf>,
    listen_address: Option<String>,
    schema_url: Option<String>,
    schema_dir: Option<PathBuf>,
    http_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

async fn run_server(args: ServerArgs) -> Result<(), u8> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path).map_err(|e| {
            eprintln!("Error: {}", e);
            2u8
        })?,
        None => Config::default(),
    };

    if let Some(listen_address) = args.listen_address {
        config.listen_address = listen_address;
    }
    if let Some(schema_url) = args.schema_url {
        config.schema_url = schema_url;
    }
    if let Some(schema_dir) = args.schema_dir {
        config.schema_dir = Some(schema_dir);
    }
    if let Some(secs) = args.http_timeout_secs {
        config.http_timeout_secs = secs;
    }
    if let Some(secs) = args.request_timeout_secs {
        config.request_timeout_secs = secs;
    }

    serve(config).await.map_err(|e| {
        eprintln!("Error: {}", e);
        match e {
            oasf_sdk::ServerError::Io(_) => 3u8,
            _ => 2u8,
        }
    })
}

fn run_decode(file: &Path, pretty: bool) -> Result<(), u8> {
    let doc = read_document(file)?;
    let decoded = decode_record(&doc).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    print_json(&decoded, pretty)
}

async fn run_validate(
    file: &Path,
    schema_url: &str,
    schema_dir: Option<&Path>,
    strict: bool,
    json_output: bool,
) -> Result<(), u8> {
    let doc = read_document(file)?;

    let result = match schema_dir {
        Some(dir) => LocalSchemas::from_dir(dir).and_then(|schemas| schemas.validate(&doc)),
        None => {
            let validator = Validator::new().map_err(|e| {
                report_error(json_output, &e.to_string());
                e.exit_code() as u8
            })?;
            let cancel = cancel_on_ctrl_c();
            validator
                .validate_record(&doc, schema_url, strict, &cancel)
                .await
        }
    };

    let outcome = result.map_err(|e| {
        report_error(json_output, &e.to_string());
        e.exit_code() as u8
    })?;
    report_outcome(&outcome, json_output);

    if outcome.is_valid {
        Ok(())
    } else {
        Err(1)
    }
}

fn report_outcome(outcome: &ValidationOutcome, json_output: bool) {
    if json_output {
        println!(
            "{}",
            json!({
                "valid": outcome.is_valid,
                "errors": outcome.errors,
                "warnings": outcome.warnings
            })
        );
        return;
    }

    if outcome.is_valid {
        println!("Valid");
    } else {
        eprintln!("Validation failed:");
        for error in &outcome.errors {
            eprintln!("  {}", error);
        }
    }
    if !outcome.warnings.is_empty() {
        eprintln!("Warnings:");
        for warning in &outcome.warnings {
            eprintln!("  {}", warning);
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", json!({"valid": false, "error": msg}));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_translate(direction: Direction, file: &Path, pretty: bool) -> Result<(), u8> {
    let doc = read_document(file)?;

    let fail = |e: oasf_sdk::TranslateError| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    };

    match direction {
        Direction::ToGhcopilot => {
            let config = translate::record_to_ghcopilot(&doc).map_err(fail)?;
            print_json(&config, pretty)
        }
        Direction::ToA2a => {
            let card = translate::record_to_a2a(&doc).map_err(fail)?;
            print_json(&card, pretty)
        }
        Direction::FromA2a => {
            let record = translate::a2a_to_record(&wrap(doc, "a2aCard")).map_err(fail)?;
            print_json(&record, pretty)
        }
        Direction::FromMcp => {
            let record = translate::mcp_to_record(&wrap(doc, "server")).map_err(fail)?;
            print_json(&record, pretty)
        }
    }
}

/// Accept both the bare document and the `{key: document}` envelope.
fn wrap(doc: Document, key: &str) -> Document {
    if doc.get(key).is_some_and(Value::is_object) {
        return doc;
    }
    let mut envelope = serde_json::Map::new();
    envelope.insert(key.to_string(), doc);
    Value::Object(envelope)
}

async fn run_schema(schema_url: &str, command: SchemaCommand) -> Result<(), u8> {
    let client = SchemaClient::new(schema_url).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    let cancel = cancel_on_ctrl_c();

    let result = match command {
        SchemaCommand::Versions => client
            .get_versions(&cancel)
            .await
            .and_then(|v| to_value(&v)),
        SchemaCommand::Record { version } => {
            client.get_record_schema(version.as_deref(), &cancel).await
        }
        SchemaCommand::Defs { key, version } => {
            client
                .get_schema_key(&key, version.as_deref(), &cancel)
                .await
        }
    };

    let value = result.map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    print_json(&value, true)
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, oasf_sdk::ClientError> {
    serde_json::to_value(value).map_err(|e| oasf_sdk::ClientError::Protocol {
        url: String::new(),
        message: e.to_string(),
    })
}

/// A token cancelled by Ctrl+C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            child.cancel();
        }
    });
    token
}

fn read_document(path: &Path) -> Result<Document, u8> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(|e| {
            eprintln!("Error reading stdin: {}", e);
            3u8
        })?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| {
            eprintln!("Error reading {}: {}", path.display(), e);
            3u8
        })?
    };

    document::parse_str(&content).map_err(|e| {
        eprintln!("Error: {}: {}", path.display(), e);
        e.kind().exit_code() as u8
    })
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), u8> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);
    Ok(())
}
