//! Bitbridge CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: connection settings come from flags or the
//!    `BITBUCKET_USER`, `BITBUCKET_TOKEN`, `BITBUCKET_API_URL` and
//!    `BITBRIDGE_APPLICATION` environment variables.
//! 2. **Wire observability**: `tracing-subscriber` with a JSON layer on
//!    stderr and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an OpenTelemetry
//!    OTLP exporter. Command output goes to stdout.
//! 3. **Construct infrastructure**: a [`BitbucketProvider`] configured from
//!    the connection settings.
//! 4. **Run one command** against a [`ChangeEvent`] read from a JSON file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bitbucket::{parse_webhook, BitbucketProvider, DEFAULT_API_URL};
use clap::{Args, Parser, Subcommand};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use pipeline::{
    AdapterOptions, ChangeEvent, Conclusion, LifecyclePhase, StatusReport, VersionControl,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "bitbridge", version, about = "Bitbucket Cloud backend for CI pipelines")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ConnectionArgs {
    /// Bitbucket API user.
    #[arg(long, env = "BITBUCKET_USER", global = true, default_value = "")]
    username: String,

    /// Bitbucket API token or app password.
    #[arg(
        long,
        env = "BITBUCKET_TOKEN",
        global = true,
        default_value = "",
        hide_env_values = true,
        hide_default_value = true
    )]
    token: String,

    /// Bitbucket API base URL; also the fallback status link.
    #[arg(long, env = "BITBUCKET_API_URL", global = true, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Application name shown on statuses and comments.
    #[arg(long, env = "BITBRIDGE_APPLICATION", global = true, default_value = "Bitbridge")]
    application_name: String,
}

impl ConnectionArgs {
    fn options(&self) -> AdapterOptions {
        AdapterOptions::new(&self.application_name, &self.api_url)
            .with_credentials(&self.username, &self.token)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the backend's static metadata.
    Metadata,

    /// Turn a webhook body into a change event.
    ParseWebhook {
        /// Value of the X-Event-Key header (e.g. `repo:push`).
        #[arg(long)]
        event_key: String,
        /// File holding the webhook body.
        #[arg(long)]
        body: PathBuf,
    },

    /// Resolve the event's reference and print the enriched event.
    Commit {
        #[arg(long)]
        event: PathBuf,
    },

    /// Post a commit status (and a pull request comment when applicable).
    Status {
        #[arg(long)]
        event: PathBuf,
        /// skipped, neutral, failure, pending, success or completed.
        #[arg(long)]
        conclusion: String,
        /// queued, in_progress or completed.
        #[arg(long, default_value = "completed")]
        phase: String,
        #[arg(long, default_value = "")]
        details_url: String,
        #[arg(long, default_value = "")]
        title: String,
        /// File holding the long-form text posted as a comment.
        #[arg(long)]
        text_file: Option<PathBuf>,
    },

    /// Print every YAML file under a directory as one document stream.
    ConfigDir {
        #[arg(long)]
        event: PathBuf,
        #[arg(long)]
        path: String,
    },

    /// Print one file from the repository.
    File {
        #[arg(long)]
        event: PathBuf,
        #[arg(long)]
        path: String,
        /// Branch or commit; defaults to the event's head branch.
        #[arg(long)]
        reference: Option<String>,
    },
}

fn read_event(path: &Path) -> Result<ChangeEvent> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading event from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing event in {}", path.display()))
}

fn connected(options: &AdapterOptions) -> Result<BitbucketProvider> {
    let mut provider = BitbucketProvider::new();
    provider
        .set_client(options)
        .context("configuring Bitbucket client")?;
    Ok(provider)
}

fn init_tracing() -> Result<Option<TracerProvider>> {
    let provider = match std::env::var_os("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Some(_) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .build()
                .context("building OTLP span exporter")?;
            Some(
                TracerProvider::builder()
                    .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
                    .build(),
            )
        }
        None => None,
    };
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("bitbridge")));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .with(otel_layer)
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(provider)
}

async fn run(cli: Cli) -> Result<()> {
    let options = cli.connection.options();
    match cli.command {
        Command::Metadata => {
            let metadata = BitbucketProvider::new().metadata();
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::ParseWebhook { event_key, body } => {
            let raw = std::fs::read_to_string(&body)
                .with_context(|| format!("reading webhook body from {}", body.display()))?;
            let event = parse_webhook(&event_key, &raw)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        Command::Commit { event } => {
            let mut event = read_event(&event)?;
            connected(&options)?.resolve_commit(&mut event).await?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        Command::Status {
            event,
            conclusion,
            phase,
            details_url,
            title,
            text_file,
        } => {
            let event = read_event(&event)?;
            let text = match text_file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading status text from {}", path.display()))?,
                None => String::new(),
            };
            let report = StatusReport {
                conclusion: Conclusion::from(conclusion),
                details_url,
                title,
                text,
                phase: LifecyclePhase::from(phase),
            };
            let delivery = connected(&options)?
                .report_status(&event, &options, &report)
                .await?;
            println!("{}", serde_json::to_string_pretty(&delivery)?);
        }
        Command::ConfigDir { event, path } => {
            let event = read_event(&event)?;
            let bundle = connected(&options)?
                .resolve_config_directory(&event, &path)
                .await?;
            print!("{bundle}");
        }
        Command::File {
            event,
            path,
            reference,
        } => {
            let event = read_event(&event)?;
            let content = connected(&options)?
                .resolve_file(&event, &path, reference.as_deref())
                .await?;
            print!("{content}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let tracer_provider = init_tracing()?;

    let result = run(cli).await;

    if let Some(provider) = tracer_provider {
        if let Err(err) = provider.shutdown() {
            tracing::warn!(error = %err, "flushing traces failed");
        }
    }
    result
}
