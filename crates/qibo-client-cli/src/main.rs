//! Qibo client command-line interface
//!
//! Submits circuits to the QRC cluster, follows their status and fetches
//! their results.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{info, result, run, status, submit, version};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let token = cli.token.as_deref();
    let verbose = cli.verbose > 0;

    let result = match cli.command {
        Commands::Run {
            input,
            shots,
            device,
            wait,
            format,
        } => run::execute(token, &input, shots, &device, &wait, format, verbose).await,

        Commands::Submit {
            input,
            shots,
            device,
        } => submit::execute(token, &input, shots, &device).await,

        Commands::Status { pid } => status::execute(&pid).await,

        Commands::Info { pid } => info::execute(&pid).await,

        Commands::Result { pid, wait, format } => {
            result::execute(&pid, &wait, format, verbose).await
        }

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
