use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "continuation-fetch")]
#[command(about = "Fetch a user's profile and image through a hand-desugared suspend function")]
#[command(long_about = "Runs the two-step find-user workflow (profile, then image) as an explicit \
                       state machine resumed by callbacks. Without a subcommand it fetches user 1, \
                       the same as 'continuation-fetch fetch'.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch one user and print the assembled result
    Fetch {
        /// User whose profile and image are fetched
        #[arg(long, default_value = "1")]
        user_id: u64,
        /// Correlation id for the request (generated when omitted)
        #[arg(long)]
        request_id: Option<String>,
        /// Use the async/await pipeline instead of the state machine
        #[arg(long)]
        native: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one independent workflow per user concurrently
    Batch {
        /// Users to fetch
        #[arg(required = true)]
        user_ids: Vec<u64>,
        /// Print each result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Continue a workflow from a JSON snapshot of its state
    Resume {
        /// Path to the snapshot file
        #[arg(long)]
        snapshot: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}
