//! Protoquery CLI
//!
//! - `protoquery compile <file|->` prints the SPARQL generated for a document
//! - `protoquery run <file|->` executes it against an endpoint and prints the
//!   decoded JSON

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use protoquery_client::SparqlClient;
use protoquery_core::dsl::LangTag;
use protoquery_core::{TransformOptions, Transformer};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod document;

#[derive(Parser)]
#[command(name = "protoquery")]
#[command(author, version, about = "Query SPARQL endpoints with JSON prototypes")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). Overrides RUST_LOG.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a document and run it against a SPARQL endpoint.
    Run {
        /// Input document (`-` for stdin).
        input: PathBuf,

        #[command(flatten)]
        options: OptionArgs,

        /// Endpoint URL.
        #[arg(long, default_value = protoquery_core::DEFAULT_ENDPOINT)]
        endpoint: String,

        /// Request timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Print JSON on one line.
        #[arg(long)]
        compact: bool,
    },

    /// Print the SPARQL query generated for a document.
    Compile {
        /// Input document (`-` for stdin).
        input: PathBuf,
    },
}

#[derive(Args)]
struct OptionArgs {
    /// JSON-LD context for graph output (a JSON value or a bare IRI).
    #[arg(long)]
    context: Option<String>,

    /// Strip language tags from literals unless the document sets `$langTag`.
    #[arg(long)]
    hide_lang_tags: bool,

    /// Log compiled queries at info level.
    #[arg(long)]
    log_queries: bool,
}

impl OptionArgs {
    fn into_options(self, endpoint: String) -> TransformOptions {
        TransformOptions {
            context: self.context.map(|raw| {
                serde_json::from_str(&raw).unwrap_or(Value::String(raw))
            }),
            endpoint,
            lang_tag: if self.hide_lang_tags {
                LangTag::Hide
            } else {
                LangTag::Show
            },
            log_queries: self.log_queries,
            ..TransformOptions::default()
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            input,
            options,
            endpoint,
            timeout,
            compact,
        } => cmd_run(&input, options.into_options(endpoint), timeout, compact).await,
        Commands::Compile { input } => cmd_compile(&input),
    }
}

async fn cmd_run(
    input: &Path,
    options: TransformOptions,
    timeout: Option<u64>,
    compact: bool,
) -> Result<()> {
    let document = document::load(input)?;
    tracing::debug!(input = %input.display(), endpoint = %options.endpoint, "loaded document");

    let client = match timeout {
        Some(secs) => SparqlClient::with_timeout(&options.endpoint, Duration::from_secs(secs))?,
        None => SparqlClient::new(&options.endpoint)?,
    };

    eprintln!(
        "{} {} against {}",
        "Running".green().bold(),
        input.display(),
        client.endpoint().as_str().bold()
    );

    let transformer = Transformer::new(client).with_options(options);
    let output = transformer
        .transform(&document)
        .await
        .with_context(|| format!("failed to run {}", input.display()))?;

    print_json(&output, compact)?;
    eprintln!("{} {} entries", "ok".green().bold(), entry_count(&output));
    Ok(())
}

fn cmd_compile(input: &Path) -> Result<()> {
    let document = document::load(input)?;
    let compiled = protoquery_core::compile(&document)
        .with_context(|| format!("failed to compile {}", input.display()))?;
    println!("{}", compiled.sparql);
    Ok(())
}

fn print_json(value: &Value, compact: bool) -> Result<()> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{text}");
    Ok(())
}

fn entry_count(output: &Value) -> usize {
    match output {
        Value::Array(entries) => entries.len(),
        Value::Object(map) => map
            .get("@graph")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
        _ => 0,
    }
}
