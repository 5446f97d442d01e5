//! Status command implementation.

use anyhow::Result;
use console::style;

use qibo_client::JobStatus;

use super::common::attach;

/// Execute the status command.
pub async fn execute(pid: &str) -> Result<()> {
    let (mut job, _) = attach(pid)?;

    let styled = match job.status().await? {
        Some(status @ JobStatus::Done) => style(status.to_string()).green().bold(),
        Some(status @ JobStatus::Error) => style(status.to_string()).red().bold(),
        Some(status @ JobStatus::Queued) => style(status.to_string()).yellow().bold(),
        Some(status) => style(status.to_string()).cyan().bold(),
        None => style("Unknown".to_string()).dim(),
    };

    println!("Job {}: {}", style(pid).dim(), styled);
    Ok(())
}
