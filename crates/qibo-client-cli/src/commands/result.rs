//! Result command implementation.
//!
//! Wait for a job and display its result.

use anyhow::Result;
use console::style;

use crate::cli::{OutputFormat, WaitArgs};

use super::common::{attach, poll_options, print_result, spinner};

/// Execute the result command.
pub async fn execute(
    pid: &str,
    wait: &WaitArgs,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let (mut job, config) = attach(pid)?;
    let options = poll_options(&config, wait, verbose);

    println!(
        "{} Fetching results for job {}",
        style("→").cyan().bold(),
        style(pid).dim()
    );

    let progress = spinner("Waiting for job to complete...")?;
    let result = job.result(&options).await;
    progress.finish_and_clear();

    print_result(&result?, job.results_folder(), format)
}
