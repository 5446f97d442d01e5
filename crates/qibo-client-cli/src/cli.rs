//! Command-line argument definitions.

use clap::{Parser, Subcommand, ValueEnum};

/// Qibo client - run quantum circuits on the QRC cluster
#[derive(Debug, Parser)]
#[command(name = "qibo-client")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Authentication token for the cluster
    #[arg(long, env = "QIBO_CLIENT_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Submit a circuit and wait for its result
    Run {
        /// Circuit file (JSON)
        #[arg(short, long)]
        input: String,

        /// Number of shots
        #[arg(short, long, default_value = "1000")]
        shots: u32,

        /// Execution device
        #[arg(short, long, default_value = "sim")]
        device: String,

        #[command(flatten)]
        wait: WaitArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Submit a circuit and print its job id
    Submit {
        /// Circuit file (JSON)
        #[arg(short, long)]
        input: String,

        /// Number of shots
        #[arg(short, long, default_value = "1000")]
        shots: u32,

        /// Execution device
        #[arg(short, long, default_value = "sim")]
        device: String,
    },

    /// Query job status
    Status {
        /// Job id
        pid: String,
    },

    /// Show everything the cluster knows about a job
    Info {
        /// Job id
        pid: String,
    },

    /// Wait for a job and retrieve its result
    Result {
        /// Job id
        pid: String,

        #[command(flatten)]
        wait: WaitArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show version information
    Version,
}

/// Polling behavior while waiting for results.
#[derive(Debug, Clone, clap::Args)]
pub struct WaitArgs {
    /// Seconds between two result checks (defaults to SECONDS_BETWEEN_CHECKS)
    #[arg(long)]
    pub wait_secs: Option<u64>,

    /// Give up after this many seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
