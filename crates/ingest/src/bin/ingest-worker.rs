//! ingest-worker: consumes S3 object-created notifications from SQS and
//! loads the referenced GeoJSON documents into PostGIS.

use anyhow::Context;
use clap::Parser;
use tracing::info;

use geoingest_core::config::{load_dotenv, MAX_RECEIVE_BATCH};
use geoingest_core::{retry, Config};
use geoingest_ingest::db;
use geoingest_ingest::{ConsumerLoop, MessageProcessor, PgFeatureWriter};
use geoingest_queue::{ReceiveOptions, SqsConsumer};
use geoingest_storage::ObjectStoreFetcher;

// ── CLI ─────────────────────────────────────────────────────────────

/// GeoJSON ingestion worker. Settings come from the environment (and `.env`);
/// flags override the queue receive parameters.
#[derive(Parser, Debug)]
#[command(name = "ingest-worker", version, about)]
struct Cli {
    /// Config profile; keys are looked up as `{PROFILE}_{KEY}` first.
    #[arg(long, env = "GEOINGEST_PROFILE", default_value = "")]
    profile: String,

    /// Messages per receive (1-10).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_RECEIVE_BATCH as i64))]
    max_messages: Option<u32>,

    /// Long-poll wait in seconds.
    #[arg(long)]
    wait_time_secs: Option<u32>,

    /// Visibility timeout applied to received messages, in seconds.
    #[arg(long)]
    visibility_timeout_secs: Option<u32>,

    /// Process a single batch and exit.
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(n) = self.max_messages {
            config.queue.max_messages = n;
        }
        if let Some(secs) = self.wait_time_secs {
            config.queue.wait_time_secs = secs;
        }
        if let Some(secs) = self.visibility_timeout_secs {
            config.queue.visibility_timeout_secs = secs;
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::for_profile(&cli.profile).context("invalid configuration")?;
    cli.apply(&mut config);
    config
        .queue
        .validate()
        .context("invalid queue receive settings")?;
    config.log_summary();

    let startup = config.startup.retry_policy();

    let pool = retry(&startup, "Postgres", || db::connect(&config.postgres))
        .await
        .context("could not connect to Postgres")?;
    retry(&startup, "schema", || db::ensure_schema(&pool))
        .await
        .context("could not prepare the geo_features schema")?;

    let fetcher = ObjectStoreFetcher::s3(config.aws.clone());
    let writer = PgFeatureWriter::new(pool.clone());

    let queue = retry(&startup, "queue", || {
        SqsConsumer::connect(&config.aws, &config.queue)
    })
    .await
    .context("could not resolve the ingest queue")?;
    info!(queue_url = %queue.queue_url(), "Using queue");

    let worker = ConsumerLoop::new(
        queue,
        MessageProcessor::new(fetcher, writer),
        ReceiveOptions::from(&config.queue),
        config.queue.poll_error_delay,
    );

    if cli.once {
        let outcome = worker.poll_once().await.context("queue receive failed")?;
        info!(
            received = outcome.received,
            acked = outcome.acked,
            failed = outcome.failed,
            "Single batch done"
        );
    } else {
        tokio::select! {
            _ = worker.run() => {}
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for shutdown signal")?;
                info!("Shutdown signal received");
            }
        }
    }

    pool.close().await;
    info!("ingest-worker exited cleanly");
    Ok(())
}
