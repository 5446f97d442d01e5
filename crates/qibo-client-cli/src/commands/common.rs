//! Shared helpers for CLI commands.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use qibo_client::{CircuitPayload, Client, ClientConfig, JobResult, PollOptions, QiboJob};

use crate::cli::{OutputFormat, WaitArgs};

/// Number of outcomes shown in table output.
const MAX_ROWS: usize = 16;

/// Load a circuit from a JSON file.
pub fn load_circuit(path: &str) -> Result<CircuitPayload> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }
    CircuitPayload::from_file(path).with_context(|| format!("Failed to read circuit: {path}"))
}

/// Load the client configuration from `.env` and the environment.
pub fn load_config() -> Result<ClientConfig> {
    ClientConfig::load().context("Invalid client configuration")
}

/// Connect to the cluster, checking the server version.
pub async fn connect(token: Option<&str>) -> Result<Client> {
    let token = token.ok_or_else(|| {
        anyhow::anyhow!("No token given. Pass --token or set QIBO_CLIENT_TOKEN.")
    })?;
    let config = load_config()?;
    let client = Client::new(config, token)
        .await
        .context("Failed to connect to the QRC cluster")?;
    Ok(client)
}

/// Handle on an existing job. Job queries need no token.
pub fn attach(pid: &str) -> Result<(QiboJob, ClientConfig)> {
    let config = load_config()?;
    let job = QiboJob::new(pid, &config)?;
    Ok((job, config))
}

/// Poll options from the configuration, overridden by the command line.
///
/// `verbose` logs an event before every pause.
pub fn poll_options(config: &ClientConfig, wait: &WaitArgs, verbose: bool) -> PollOptions {
    let mut options = PollOptions::from_config(config).with_verbose(verbose);
    if let Some(secs) = wait.wait_secs {
        options.interval = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = wait.timeout {
        options = options.with_deadline(Duration::from_secs(secs));
    }
    options
}

/// Spinner shown while waiting on the cluster.
pub fn spinner(message: impl Into<String>) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// `|0101⟩`-style label of basis state `index` among `len` states.
pub fn basis_label(index: usize, len: usize) -> String {
    if len.is_power_of_two() && len > 1 {
        let width = len.trailing_zeros() as usize;
        format!("|{index:0width$b}⟩")
    } else {
        format!("[{index}]")
    }
}

/// Print a job result (shared by run and result).
pub fn print_result(result: &JobResult, folder: Option<&Path>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(result, folder),
        OutputFormat::Table => {
            print_table(result, folder);
            Ok(())
        }
    }
}

fn print_json(result: &JobResult, folder: Option<&Path>) -> Result<()> {
    let payload = result.payload().map(|state| {
        serde_json::json!({
            "shape": state.shape(),
            "probabilities": state.probabilities().iter().copied().collect::<Vec<f64>>(),
        })
    });
    let out = serde_json::json!({
        "pid": result.pid(),
        "success": result.is_success(),
        "results_folder": folder.map(|f| f.display().to_string()),
        "payload": payload,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn print_table(result: &JobResult, folder: Option<&Path>) {
    let Some(state) = result.payload() else {
        println!(
            "{} Job {} did not succeed",
            style("✗").red().bold(),
            style(result.pid()).dim()
        );
        if let Some(folder) = folder {
            println!("  Inspect the files in {}", style(folder.display()).yellow());
        }
        return;
    };

    println!(
        "\n{} Results for job {} (shape {:?}):",
        style("✓").green().bold(),
        style(result.pid()).dim(),
        state.shape()
    );

    if state.shape().len() != 1 {
        println!("{state}");
        return;
    }

    let probabilities = state.probabilities();
    let len = probabilities.len();
    let mut sorted: Vec<(usize, f64)> = probabilities.iter().copied().enumerate().collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (index, prob) in sorted.iter().take(MAX_ROWS) {
        let percent = prob * 100.0;
        let bar: String = "█".repeat((percent / 2.0).round() as usize);
        println!(
            "  {}: {:>6.2}% {}",
            style(basis_label(*index, len)).cyan(),
            percent,
            style(bar).green()
        );
    }

    if len > MAX_ROWS {
        println!("  ... and {} more outcomes", len - MAX_ROWS);
    }

    if let Some(folder) = folder {
        println!("\n  Files: {}", style(folder.display()).dim());
    }
}
