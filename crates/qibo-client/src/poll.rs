//! Waiting for a job to reach a terminal state.
//!
//! The loop polls at a constant interval with no retry limit and no backoff.
//! A response without a recognizable `Job-Status` header counts as
//! non-terminal, so a server that never sends one keeps the loop going
//! unless [`PollOptions::deadline`] is set.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response};
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::api::header_status;
use crate::config::{ClientConfig, DEFAULT_SECONDS_BETWEEN_CHECKS};
use crate::error::{ClientError, ClientResult};
use crate::status::JobStatus;

/// How to wait for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    /// Pause between two requests.
    pub interval: Duration,
    /// Emit an `info` event before every pause.
    pub verbose: bool,
    /// Give up once this much time has passed. `None` waits forever.
    pub deadline: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SECONDS_BETWEEN_CHECKS),
            verbose: false,
            deadline: None,
        }
    }
}

impl PollOptions {
    /// Poll every `interval`, quietly and without a deadline.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Use the configured interval.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.poll_interval())
    }

    /// Toggle the per-iteration log line.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Bound the total wait.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Call `fetch` until it reports a terminal status, sleeping
/// `options.interval` between calls.
///
/// Returns the value of the first terminal fetch without sleeping. Errors
/// from `fetch` are returned immediately. `label` names the polled resource
/// in timeout errors.
pub async fn poll_until_terminal<T, F, Fut>(
    label: &str,
    options: &PollOptions,
    mut fetch: F,
) -> ClientResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClientResult<(Option<JobStatus>, T)>>,
{
    let start = Instant::now();

    loop {
        let (status, value) = fetch().await?;
        if status.is_some_and(JobStatus::is_terminal) {
            return Ok(value);
        }

        if let Some(deadline) = options.deadline {
            if start.elapsed() + options.interval > deadline {
                return Err(ClientError::Timeout {
                    url: label.to_string(),
                    waited: start.elapsed(),
                });
            }
        }

        if options.verbose {
            info!(
                "Check results every {} seconds ...",
                options.interval.as_secs_f64()
            );
        }
        sleep(options.interval).await;
    }
}

/// GET `url` until its `Job-Status` header is `success` or `error`.
///
/// The returned response's body has not been read yet. Non-2xx responses
/// fail the wait with [`ClientError::Http`].
pub async fn wait_for_terminal_status(
    http: &Client,
    url: &str,
    options: &PollOptions,
) -> ClientResult<Response> {
    poll_until_terminal(url, options, move || async move {
        debug!("GET {}", url);
        let response = http.get(url).send().await?.error_for_status()?;
        let status = header_status(&response);
        debug!("{} -> {:?}", url, status);
        Ok((status, response))
    })
    .await
}
