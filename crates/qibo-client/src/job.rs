//! Handle on a job running on the QRC cluster.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::TryStreamExt;
use reqwest::Client;
use tracing::{debug, error, info, instrument};

use crate::api::{
    JobInfo, StatusResponse, check_keys, header_status, http_client, info_url, job_api_error,
    json_body, result_url, status_url,
};
use crate::archive::unpack_byte_stream_to_folder;
use crate::circuit::CircuitPayload;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::payload::{QuantumState, RESULTS_FILE_NAME, load_payload};
use crate::poll::{PollOptions, wait_for_terminal_status};
use crate::status::{CachedStatus, JobStatus};

/// Outcome of a finished job.
///
/// A payload is present exactly when the job succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pid: String,
    success: bool,
    payload: Option<QuantumState>,
}

impl JobResult {
    /// A successful result carrying the decoded payload.
    pub fn success(pid: impl Into<String>, payload: QuantumState) -> Self {
        Self {
            pid: pid.into(),
            success: true,
            payload: Some(payload),
        }
    }

    /// A non-successful result without payload.
    pub fn failure(pid: impl Into<String>) -> Self {
        Self {
            pid: pid.into(),
            success: false,
            payload: None,
        }
    }

    /// Job the result belongs to.
    pub fn pid(&self) -> &str {
        &self.pid
    }

    /// Whether the job succeeded and its payload was decoded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Decoded payload, if the job succeeded.
    pub fn payload(&self) -> Option<&QuantumState> {
        self.payload.as_ref()
    }

    /// Consume the result, returning the payload.
    pub fn into_payload(self) -> Option<QuantumState> {
        self.payload
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Some(payload) => write!(f, "{payload}"),
            None => write!(f, "None"),
        }
    }
}

/// One job on the cluster, identified by its `pid`.
///
/// The cached status is only ever written from server responses. Creating or
/// dropping a handle has no effect on the server.
pub struct QiboJob {
    pid: String,
    base_url: String,
    http: Client,
    results_root: PathBuf,
    poll_interval: Duration,

    circuit: Option<CircuitPayload>,
    nshots: Option<u32>,
    device: Option<String>,
    lab_location: Option<String>,
    status: CachedStatus,
    results_folder: Option<PathBuf>,
}

impl fmt::Debug for QiboJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QiboJob")
            .field("pid", &self.pid)
            .field("base_url", &self.base_url)
            .field("nshots", &self.nshots)
            .field("device", &self.device)
            .field("lab_location", &self.lab_location)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl QiboJob {
    /// Attach to an existing job by pid, with a dedicated HTTP client.
    pub fn new(pid: impl Into<String>, config: &ClientConfig) -> ClientResult<Self> {
        let http = http_client(config)?;
        Ok(Self::with_http(pid, config, http))
    }

    /// Attach to an existing job by pid, sharing `http`.
    pub fn with_http(pid: impl Into<String>, config: &ClientConfig, http: Client) -> Self {
        Self {
            pid: pid.into(),
            base_url: config.base_url(),
            http,
            results_root: config.results_root.clone(),
            poll_interval: config.poll_interval(),
            circuit: None,
            nshots: None,
            device: None,
            lab_location: None,
            status: CachedStatus::Unfetched,
            results_folder: None,
        }
    }

    /// Record the submitted circuit.
    pub fn with_circuit(mut self, circuit: CircuitPayload) -> Self {
        self.circuit = Some(circuit);
        self
    }

    /// Record the number of shots.
    pub fn with_nshots(mut self, nshots: u32) -> Self {
        self.nshots = Some(nshots);
        self
    }

    /// Record the execution device.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Record the lab hosting the device.
    pub fn with_lab_location(mut self, lab_location: impl Into<String>) -> Self {
        self.lab_location = Some(lab_location.into());
        self
    }

    pub fn pid(&self) -> &str {
        &self.pid
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn circuit(&self) -> Option<&CircuitPayload> {
        self.circuit.as_ref()
    }

    pub fn nshots(&self) -> Option<u32> {
        self.nshots
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn lab_location(&self) -> Option<&str> {
        self.lab_location.as_deref()
    }

    /// Last status fetched from the server, without a network call.
    pub fn cached_status(&self) -> CachedStatus {
        self.status
    }

    /// Folder the last [`result`](Self::result) call extracted into.
    pub fn results_folder(&self) -> Option<&Path> {
        self.results_folder.as_deref()
    }

    /// Path of the payload file inside [`results_folder`](Self::results_folder).
    pub fn results_path(&self) -> Option<PathBuf> {
        self.results_folder
            .as_ref()
            .map(|folder| folder.join(RESULTS_FILE_NAME))
    }

    /// Resynchronize every attribute from `GET /job/info/{pid}`.
    ///
    /// Fields missing from the response are cleared. Does not fetch results.
    ///
    /// # Errors
    ///
    /// A non-2xx response yields [`ClientError::JobApi`] built from the body's
    /// `detail`; a body without `detail` yields
    /// [`ClientError::MalformedResponse`].
    #[instrument(skip(self), fields(pid = %self.pid))]
    pub async fn refresh(&mut self) -> ClientResult<()> {
        let url = info_url(&self.base_url, &self.pid);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(job_api_error(response).await);
        }

        let body = json_body(response).await?;
        if body.is_null() {
            return Ok(());
        }
        let info: JobInfo = serde_json::from_value(body)
            .map_err(|e| ClientError::MalformedResponse(format!("invalid job info: {e}")))?;
        self.apply_info(info);
        Ok(())
    }

    fn apply_info(&mut self, info: JobInfo) {
        let device = info.device.unwrap_or_default();
        self.circuit = info.circuit.map(CircuitPayload::from);
        self.nshots = info.nshots;
        self.device = device.device;
        self.lab_location = device.lab_location;
        self.status = CachedStatus::from_token(info.status.as_deref());
    }

    /// Fetch the status from `GET /job/status/{pid}` and cache it.
    ///
    /// Returns `None` when the server sends a token that is not a known status.
    ///
    /// # Errors
    ///
    /// Unlike [`refresh`](Self::refresh), a non-2xx response is returned as
    /// the raw [`ClientError::Http`].
    #[instrument(skip(self), fields(pid = %self.pid))]
    pub async fn status(&mut self) -> ClientResult<Option<JobStatus>> {
        let url = status_url(&self.base_url, &self.pid);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?;

        let body = json_body(response).await?;
        check_keys(&body, &["status"])?;
        let reply: StatusResponse = serde_json::from_value(body)?;

        self.status = CachedStatus::from_token(reply.status.as_deref());
        Ok(self.status.known())
    }

    /// Whether the job is running.
    ///
    /// Refreshes only if no status was ever fetched; otherwise answers from
    /// the cache and may be stale. Call [`refresh`](Self::refresh) first for
    /// a fresh answer.
    pub async fn running(&mut self) -> ClientResult<bool> {
        self.ensure_status().await?;
        Ok(self.status == CachedStatus::Known(JobStatus::Running))
    }

    /// Whether the job completed successfully. Same caching as
    /// [`running`](Self::running).
    pub async fn done(&mut self) -> ClientResult<bool> {
        self.ensure_status().await?;
        Ok(self.status == CachedStatus::Known(JobStatus::Done))
    }

    async fn ensure_status(&mut self) -> ClientResult<()> {
        if !self.status.is_fetched() {
            self.refresh().await?;
        }
        Ok(())
    }

    /// [`result`](Self::result) with the configured interval, quiet and
    /// without deadline.
    pub async fn result_with_defaults(&mut self) -> ClientResult<JobResult> {
        let options = PollOptions::new(self.poll_interval);
        self.result(&options).await
    }

    /// Wait for the job to finish and retrieve its result.
    ///
    /// Polls `GET /job/result/{pid}/` until the `Job-Status` header is
    /// terminal, then unpacks the archive into `<results_root>/<pid>/` and
    /// decodes [`RESULTS_FILE_NAME`].
    ///
    /// Returns a non-successful [`JobResult`] when the body is not a valid
    /// archive (the folder is left as is for inspection) or when the job
    /// ended with `error`.
    ///
    /// Two concurrent calls for the same pid write to the same folder; callers
    /// must serialize them.
    ///
    /// # Errors
    ///
    /// Network failures, a deadline in `options`, I/O failures while
    /// extracting, and an undecodable payload
    /// ([`ClientError::PayloadDecode`]) are returned as errors.
    #[instrument(skip(self, options), fields(pid = %self.pid))]
    pub async fn result(&mut self, options: &PollOptions) -> ClientResult<JobResult> {
        let url = result_url(&self.base_url, &self.pid);
        let response =
            wait_for_terminal_status(&self.http, &url, options).await?;

        let terminal = header_status(&response);
        if let Some(status) = terminal {
            self.status = CachedStatus::Known(status);
        }

        let folder = self.results_root.join(&self.pid);
        tokio::fs::create_dir_all(&folder).await?;
        self.results_folder = Some(folder.clone());

        let body = response.bytes_stream().map_err(io::Error::other);
        if let Err(err) = unpack_byte_stream_to_folder(body, &folder).await {
            if !err.is_format() {
                return Err(err.into());
            }
            error!("Caught archive error: {}", err);
            error!(
                "The received file is not a valid gzip archive, the result might have to be \
                 inspected manually. Find the file at `{}`",
                folder.display()
            );
            return Ok(JobResult::failure(&self.pid));
        }

        if terminal == Some(JobStatus::Error) {
            info!(
                "Job exited with error, check logs in {} folder",
                folder.display()
            );
            return Ok(JobResult::failure(&self.pid));
        }

        let payload = load_payload(&folder.join(RESULTS_FILE_NAME))?;
        Ok(JobResult::success(&self.pid, payload))
    }
}
