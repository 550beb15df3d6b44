//! Relay mail from S3 to a local LMTP server
//!
//! `ferry` (or `ferry serve`) runs the notification endpoint and the
//! dead-letter retry worker. `deliver` and `drain` are one-shot operations
//! for manual recovery.

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

use clap::{Parser, Subcommand};
use ferry::{Ferry, FerryConfig};
use ferry_common::logging;

#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(about = "Relay mail from S3 to a local LMTP server", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the notification endpoint and the dead letter queue worker (default)
    Serve,
    /// Deliver a single stored message
    Deliver {
        /// Bucket holding the message
        #[arg(long)]
        bucket: String,

        /// Object key of the message
        #[arg(long)]
        key: String,

        /// Envelope recipient; taken from the message headers when omitted
        #[arg(long = "recipient")]
        recipients: Vec<String>,
    },
    /// Process the dead letter queue once and exit
    Drain,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init();

    let ferry = Ferry::new(FerryConfig::load()?);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => ferry.run().await,
        Commands::Deliver {
            bucket,
            key,
            recipients,
        } => ferry.deliver(&bucket, &key, &recipients).await,
        Commands::Drain => ferry.drain().await.map(drop),
    }
}
