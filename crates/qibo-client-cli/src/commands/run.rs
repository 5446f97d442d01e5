//! Run command implementation.

use anyhow::Result;
use console::style;

use crate::cli::{OutputFormat, WaitArgs};

use super::common::{connect, load_circuit, poll_options, print_result, spinner};

/// Execute the run command.
pub async fn execute(
    token: Option<&str>,
    input: &str,
    shots: u32,
    device: &str,
    wait: &WaitArgs,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    println!(
        "{} Running {} on {} ({} shots)",
        style("→").cyan().bold(),
        style(input).green(),
        style(device).yellow(),
        shots
    );

    let circuit = load_circuit(input)?;
    let client = connect(token).await?;
    let options = poll_options(client.config(), wait, verbose);

    let mut job = client.run_circuit(&circuit, shots, device).await?;
    println!("  Job: {}", style(job.pid()).dim());

    let progress = spinner(format!(
        "Checking results every {}s ...",
        options.interval.as_secs()
    ))?;
    let result = job.result(&options).await;
    progress.finish_and_clear();

    print_result(&result?, job.results_folder(), format)
}
