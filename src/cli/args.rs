//! CLI argument definitions.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ragchat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Backend base URL (e.g., http://127.0.0.1:8000)
    #[arg(short, long, global = true)]
    pub base_url: Option<String>,

    /// Status poll interval in milliseconds
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question and stream the answer to stdout
    Ask {
        /// The question to send
        query: String,
    },
    /// Print the backend status report
    Status,
    /// Ask the backend to rebuild its document index
    Reindex,
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigSubcommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigSubcommands {
    /// Initialize a new config file
    Init,
    /// Print config file location
    Where,
    /// Print the effective configuration
    Show,
}
