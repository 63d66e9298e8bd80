//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use outbox_engine::MutationKind;

#[derive(Parser, Debug)]
#[command(name = "outbox")]
#[command(about = "Durable offline mutation queue")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a mutation in the queue
    Enqueue {
        /// Mutation kind, e.g. ITEM_ADD or item-update
        #[arg(short, long)]
        kind: MutationKind,

        /// JSON payload
        #[arg(short, long, default_value = "{}")]
        payload: String,

        /// Collapse into an earlier queued mutation with the same kind and key
        #[arg(short, long)]
        dedupe_key: Option<String>,

        /// Idempotency id (generated if omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Print the queued mutations as JSON
    List,

    /// Run one drain cycle against the remote store
    Drain,

    /// Drain periodically until interrupted
    Run,
}
