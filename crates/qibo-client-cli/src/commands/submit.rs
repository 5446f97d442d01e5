//! Submit command implementation.

use anyhow::Result;
use console::style;

use super::common::{connect, load_circuit};

/// Execute the submit command.
pub async fn execute(token: Option<&str>, input: &str, shots: u32, device: &str) -> Result<()> {
    let circuit = load_circuit(input)?;
    let client = connect(token).await?;

    let job = client.run_circuit(&circuit, shots, device).await?;

    println!(
        "{} Submitted {} to {} ({} shots)",
        style("✓").green().bold(),
        style(input).green(),
        style(device).yellow(),
        shots
    );
    println!("  Job: {}", style(job.pid()).cyan().bold());
    println!(
        "\n  Use 'qibo-client result {}' to fetch the result.",
        job.pid()
    );

    Ok(())
}
