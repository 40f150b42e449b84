use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use log_indexer::event::{self, EventEntry};
use log_indexer::{run_batch, IndexingError, Settings};
use log_indexer_pipeline::orchestrator::{LoggingHandler, ObjectOutcome};
use log_indexer_shared::SourceObject;

#[derive(Parser)]
#[command(name = "log-indexer")]
#[command(about = "Index compressed access logs from S3 into OpenSearch", long_about = None)]
struct Cli {
    /// S3 notification document to process, `-` for stdin
    #[arg(long, conflicts_with_all = ["bucket", "key"], required_unless_present = "bucket")]
    event: Option<PathBuf>,

    /// Bucket holding the objects given with --key
    #[arg(long, requires = "key")]
    bucket: Option<String>,

    /// Decoded object key, may be repeated
    #[arg(long, requires = "bucket")]
    key: Vec<String>,
}

impl Cli {
    async fn entries(&self) -> Result<Vec<EventEntry>, IndexingError> {
        match (&self.event, &self.bucket) {
            (Some(path), _) => {
                let document = if path.as_os_str() == "-" {
                    let mut document = String::new();
                    tokio::io::stdin().read_to_string(&mut document).await?;
                    document
                } else {
                    tokio::fs::read_to_string(path).await?
                };
                event::parse_event(&document)
            }
            (None, Some(bucket)) => Ok(self
                .key
                .iter()
                .map(|key| Ok(SourceObject::new(bucket.clone(), key.clone())))
                .collect()),
            (None, None) => Err(IndexingError::config("either --event or --bucket is required")),
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli, settings: Settings) -> Result<bool, IndexingError> {
    let entries = cli.entries().await?;
    if entries.is_empty() {
        warn!("Notification named no objects");
        return Ok(true);
    }

    let handler = LoggingHandler;
    let outcomes = tokio::select! {
        outcomes = run_batch(&settings, entries, &handler) => outcomes,
        _ = tokio::signal::ctrl_c() => {
            warn!("Received shutdown signal, abandoning batch");
            return Ok(false);
        }
    };

    Ok(outcomes.iter().all(ObjectOutcome::is_success))
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(settings.json_logs);

    let cli = Cli::parse();

    match run(cli, settings).await {
        Ok(true) => {
            info!("All objects indexed");
            ExitCode::SUCCESS
        }
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Indexer failed");
            ExitCode::FAILURE
        }
    }
}
