//! dirq CLI — run a polling consumer against a shared work directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use dirq::config::Config;
use dirq::consumer::Consumer;
use dirq::event::{EventSink, TracingSink};
use dirq::identity::{ConsumerId, FixedIdentity, IdentitySource, RandomIdentity};
use dirq::poller::{PollConfig, Poller};
use dirq::processor::{ExecProcessor, Processor, processor_fn};
use dirq::telemetry::init_tracing;

#[derive(Parser)]
#[command(
    name = "dirq",
    about = "Filesystem-backed competing-consumer work queue"
)]
struct Cli {
    /// Directory to poll for work files
    root: PathBuf,

    /// Poll interval in milliseconds (overrides DIRQ_POLL_INTERVAL_MS)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stable consumer identity (overrides DIRQ_IDENTITY; random by default)
    #[arg(long)]
    identity: Option<String>,

    /// Command to run for each claimed file; the claimed path is appended
    /// as the final argument
    #[arg(long)]
    exec: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config.log_level)?;

    let interval = cli
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or(config.poll_interval);

    let id = match cli.identity.or(config.identity) {
        Some(name) => FixedIdentity::new(name).next(),
        None => RandomIdentity.next(),
    };

    match cli.exec {
        Some(command) => {
            let processor = ExecProcessor::from_command_line(&command)?;
            serve(cli.root, interval, id, processor).await
        }
        None => {
            // No command supplied: claim and archive, logging each file.
            let processor = processor_fn(|claimed: PathBuf| async move {
                info!(file = %claimed.display(), "processing claimed file");
                anyhow::Ok(())
            });
            serve(cli.root, interval, id, processor).await
        }
    }
}

async fn serve<P: Processor + 'static>(
    root: PathBuf,
    interval: Duration,
    id: ConsumerId,
    processor: P,
) -> anyhow::Result<()> {
    let events: Arc<dyn EventSink> = Arc::new(TracingSink);

    let consumer = Consumer::create(&root, id, processor, Arc::clone(&events)).await?;
    let poller = Poller::new(
        consumer,
        PollConfig::new(root).interval(interval),
        events,
    );

    let handle = poller.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        handle.shutdown();
    });

    poller.run().await?;
    Ok(())
}
