use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use crate::error::ValidationError;
use crate::media::BodyValue;
use crate::params::{parse_query, QueryParams};
use crate::spec::{load_contract, Document};
use crate::validator::ValidationState;

/// Command-line harness for contract testing
#[derive(Parser, Debug)]
#[command(name = "oapi3-check")]
#[command(
    about = "Validate requests and responses against an OpenAPI 3.0 contract",
    long_about = None
)]
pub struct Cli {
    /// Log output format
    #[arg(
        long,
        value_enum,
        global = true,
        default_value_t = LogFormat::Pretty,
        env = "OAPI3_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a contract and list its path templates and operations
    Check {
        /// Path to the contract file (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,
    },
    /// Validate one request, and optionally its response
    Request {
        /// Path to the contract file (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// HTTP method (case-insensitive)
        #[arg(short, long)]
        method: String,

        /// Request path, optionally with a `?query` suffix
        #[arg(short, long)]
        path: String,

        /// Additional query parameters as key=value (repeatable)
        #[arg(short, long)]
        query: Vec<String>,

        /// Request content type
        #[arg(long)]
        content_type: Option<String>,

        /// File holding the request body
        #[arg(long)]
        body: Option<PathBuf>,

        /// Response status code to validate
        #[arg(long)]
        status: Option<String>,

        /// Response content type
        #[arg(long, requires = "status")]
        response_content_type: Option<String>,

        /// File holding the response body
        #[arg(long, requires = "status")]
        response_body: Option<PathBuf>,
    },
}

/// Whether the checked traffic conforms to the contract.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Valid,
    Rejected,
}

/// Install a `tracing` subscriber; `RUST_LOG` overrides the default `warn` level.
pub fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    }
    .map_err(|err| anyhow::anyhow!("failed to initialize logging: {err}"))
}

/// Execute the CLI command, writing reports to `out`.
///
/// # Errors
///
/// Returns an error if the contract cannot be loaded or built, or an input file
/// cannot be read. Validation failures are reported as [`Outcome::Rejected`].
pub fn run_cli(cli: &Cli, out: &mut impl Write) -> anyhow::Result<Outcome> {
    match &cli.command {
        Commands::Check { spec } => {
            let document = load_contract(spec)?;
            describe(&document, out)?;
            Ok(Outcome::Valid)
        }
        Commands::Request {
            spec,
            method,
            path,
            query,
            content_type,
            body,
            status,
            response_content_type,
            response_body,
        } => {
            let document = load_contract(spec)?;
            let (path, query) = split_request_target(path, query)?;
            let body = read_optional(body.as_deref())?;

            let validated =
                document.validate_request(&path, method, &query, content_type.as_deref(), &body);
            let state = match validated {
                Ok(state) => state,
                Err(err) => return reject(&err, out),
            };

            if let Some(status) = status {
                let response_body = read_optional(response_body.as_deref())?;
                if let Err(err) = document.validate_response(
                    &state,
                    status,
                    response_content_type.as_deref(),
                    &response_body,
                ) {
                    return reject(&err, out);
                }
            }
            report(&state, out)?;
            Ok(Outcome::Valid)
        }
    }
}

fn describe(document: &Document, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "openapi {} ({})", document.openapi(), document.base())?;
    for template in document.router().templates() {
        writeln!(out, "{}", template.pattern)?;
        for (method, operation) in &template.operations {
            writeln!(
                out,
                "  {:<7} {}",
                method.as_str(),
                operation.operation_id.as_deref().unwrap_or("-")
            )?;
        }
    }
    Ok(())
}

fn split_request_target(target: &str, extra: &[String]) -> anyhow::Result<(String, QueryParams)> {
    let (path, mut query) = match target.split_once('?') {
        Some((path, raw)) => (path.to_string(), parse_query(raw)),
        None => (target.to_string(), QueryParams::new()),
    };
    for pair in extra {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("query parameter '{pair}' is not key=value"))?;
        query.entry(key.to_string()).or_default().push(value.to_string());
    }
    Ok((path, query))
}

fn read_optional(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => Ok(Vec::new()),
    }
}

fn reject(err: &ValidationError, out: &mut impl Write) -> anyhow::Result<Outcome> {
    let problem = json!({
        "status": err.status().as_u16(),
        "problem": err.problem(),
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&problem)?)?;
    Ok(Outcome::Rejected)
}

fn report(state: &ValidationState<'_>, out: &mut impl Write) -> anyhow::Result<()> {
    let body = match &state.body_value {
        BodyValue::Empty => Value::Null,
        BodyValue::Json(value) => value.clone(),
        BodyValue::Binary(bytes) => json!({ "bytes": bytes.len() }),
    };
    let report = json!({
        "template": state.template.pattern,
        "method": state.method.as_str(),
        "path_params": state.path_params,
        "query_params": state.query_params,
        "media_type": state.media_type.map(|m| m.content_type.as_str()),
        "body": body,
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}
