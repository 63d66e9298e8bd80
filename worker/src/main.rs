//! Outbox - command-line driver for the offline mutation queue.
//!
//! Enqueues mutations into durable storage and replays them against an HTTP
//! remote store. Only one process should drain a given storage key at a time.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use outbox_engine::Mutation;
use outbox_worker::{
    now_millis, Config, ConnectivityFlag, FileStorage, HttpHandler, HttpProbe, Outbox,
    QueueStore, SqliteStorage, Storage, StorageLocation,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Timeout for the connectivity probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outbox_worker=info,outbox=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match &config.storage {
        StorageLocation::Directory(dir) => Arc::new(FileStorage::new(dir)),
        StorageLocation::Sqlite(url) => Arc::new(SqliteStorage::connect(url).await?),
    };
    let store = QueueStore::new(storage, config.storage_key.clone());

    match cli.command {
        Commands::Enqueue {
            kind,
            payload,
            dedupe_key,
            id,
        } => {
            let payload: serde_json::Value = serde_json::from_str(&payload)?;
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            let mut mutation = Mutation::new(id, kind, payload, now_millis());
            mutation.dedupe_key = dedupe_key;

            // Enqueueing never needs the remote, so the gate stays closed.
            let outbox = Outbox::new(store, Arc::new(ConnectivityFlag::new(false)), config.replay);
            let outcome = outbox.enqueue(mutation).await?;
            println!("{}", outcome.index());
        }
        Commands::List => {
            let outbox = Outbox::new(store, Arc::new(ConnectivityFlag::new(false)), config.replay);
            let pending = outbox.pending().await;
            println!("{}", serde_json::to_string_pretty(&pending)?);
        }
        Commands::Drain => {
            let outbox = remote_outbox(&config, store)?;
            let report = outbox.drain().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Run => {
            let outbox = remote_outbox(&config, store)?;
            outbox
                .run(config.drain_interval, async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for shutdown signal: {}", e);
                    }
                })
                .await;
        }
    }

    Ok(())
}

/// Build an outbox that replays every kind against the configured remote.
fn remote_outbox(config: &Config, store: QueueStore) -> Result<Outbox, Box<dyn std::error::Error>> {
    let remote_url = config.require_remote_url()?;
    let probe = HttpProbe::new(remote_url, PROBE_TIMEOUT)?;
    let outbox = Outbox::new(store, Arc::new(probe), config.replay);

    let handler: Arc<dyn outbox_worker::MutationHandler> =
        Arc::new(HttpHandler::new(remote_url, config.replay.handler_timeout)?);
    for kind in outbox_engine::MutationKind::ALL {
        outbox.handlers().register_shared(kind, Arc::clone(&handler));
    }

    tracing::info!(remote = %remote_url, "Replaying against remote store");
    Ok(outbox)
}
