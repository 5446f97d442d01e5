//! Info command implementation.
//!
//! Print the job description stored on the cluster.

use anyhow::Result;
use console::style;

use super::common::attach;

/// Execute the info command.
pub async fn execute(pid: &str) -> Result<()> {
    let (mut job, _) = attach(pid)?;
    job.refresh().await?;

    let status = match job.cached_status().known() {
        Some(status) => status.to_string(),
        None => "Unknown".to_string(),
    };

    println!("{} Job {}", style("→").cyan().bold(), style(pid).bold());
    println!("  {:<14}{}", "Status:", style(status).yellow());
    println!("  {:<14}{}", "Device:", job.device().unwrap_or("-"));
    println!("  {:<14}{}", "Lab location:", job.lab_location().unwrap_or("-"));
    match job.nshots() {
        Some(nshots) => println!("  {:<14}{}", "Shots:", nshots),
        None => println!("  {:<14}-", "Shots:"),
    }
    if let Some(circuit) = job.circuit() {
        println!("  Circuit:");
        println!("{}", serde_json::to_string_pretty(circuit.as_value())?);
    }

    Ok(())
}
