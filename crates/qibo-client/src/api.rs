//! Wire-level helpers for the QRC cluster REST API.
//!
//! | Operation | Method & Path |
//! |-----------|---------------|
//! | Version   | `GET /qibo_version/` |
//! | Submit    | `POST /run_circuit/` |
//! | Job info  | `GET /job/info/{pid}` |
//! | Status    | `GET /job/status/{pid}` |
//! | Result    | `GET /job/result/{pid}/` (streamed archive, `Job-Status` header) |

use reqwest::{Client, Response};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::status::{JobStatus, parse_status};

/// Response header carrying the job status on the result endpoint.
pub const JOB_STATUS_HEADER: &str = "Job-Status";

/// User agent sent with every request.
const USER_AGENT: &str = concat!("qibo-client/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by a [`Client`](crate::Client) and its jobs.
///
/// The request timeout bounds connecting and each read, not the whole
/// exchange: a result archive that keeps arriving may take longer than the
/// timeout to download.
pub fn http_client(config: &ClientConfig) -> ClientResult<Client> {
    let timeout = config.request_timeout();
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .build()?;
    Ok(client)
}

/// `GET` endpoint returning the server's circuit-library version.
pub fn version_url(base_url: &str) -> String {
    format!("{base_url}/qibo_version/")
}

/// `POST` endpoint accepting new circuits.
pub fn submit_url(base_url: &str) -> String {
    format!("{base_url}/run_circuit/")
}

/// `GET` endpoint returning the full job description.
pub fn info_url(base_url: &str, pid: &str) -> String {
    format!("{base_url}/job/info/{pid}")
}

/// `GET` endpoint returning only the job status.
pub fn status_url(base_url: &str, pid: &str) -> String {
    format!("{base_url}/job/status/{pid}")
}

/// `GET` endpoint streaming the result archive.
pub fn result_url(base_url: &str, pid: &str) -> String {
    format!("{base_url}/job/result/{pid}/")
}

/// Fail with [`ClientError::MalformedResponse`] unless `body` is an object
/// holding every key in `keys`.
pub fn check_keys(body: &Value, keys: &[&str]) -> ClientResult<()> {
    let Some(object) = body.as_object() else {
        return Err(ClientError::MalformedResponse(format!(
            "expected a JSON object, got: {body}"
        )));
    };

    let missing: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|k| !object.contains_key(*k))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ClientError::MalformedResponse(format!(
            "The server response is missing the following keys: {}",
            missing.join(" ")
        )))
    }
}

/// Read a response body as JSON, reporting undecodable bodies as malformed.
pub async fn json_body(response: Response) -> ClientResult<Value> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ClientError::MalformedResponse(format!("body is not valid JSON: {e}")))
}

/// Turn a non-2xx response into [`ClientError::JobApi`].
///
/// The body must carry a `detail` field; without it the response itself is
/// malformed.
pub async fn job_api_error(response: Response) -> ClientError {
    let code = response.status().as_u16();
    let body = match json_body(response).await {
        Ok(body) => body,
        Err(e) => return e,
    };
    if let Err(e) = check_keys(&body, &["detail"]) {
        return e;
    }

    let detail = match &body["detail"] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    ClientError::JobApi { code, detail }
}

/// Parse the `Job-Status` header. Missing or unknown values map to `None`.
pub fn header_status(response: &Response) -> Option<JobStatus> {
    response
        .headers()
        .get(JOB_STATUS_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_status)
}

// ---------------------------------------------------------------------------
// Request / response serde types
// ---------------------------------------------------------------------------

/// Request body for `POST /run_circuit/`.
#[derive(Serialize)]
pub struct SubmitRequest<'a> {
    /// Authentication token of the web-app user.
    pub token: &'a str,
    /// Serialized circuit.
    pub circuit: &'a Value,
    /// Number of shots.
    pub nshots: u32,
    /// Target device name.
    pub device: &'a str,
}

impl std::fmt::Debug for SubmitRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitRequest")
            .field("token", &"[REDACTED]")
            .field("nshots", &self.nshots)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

/// Response from `POST /run_circuit/`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned process id.
    #[serde(deserialize_with = "pid_from_value")]
    pub pid: String,
    /// Human-readable acknowledgement.
    pub message: Value,
}

/// Response from `GET /qibo_version/`.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionResponse {
    /// Circuit-library version installed on the server.
    pub qibo_version: String,
}

/// Response from `GET /job/status/{pid}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    /// Wire token of the job status.
    pub status: Option<String>,
}

/// Response from `GET /job/info/{pid}`. Every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobInfo {
    /// Serialized circuit as submitted.
    #[serde(default)]
    pub circuit: Option<Value>,
    /// Number of shots.
    #[serde(default)]
    pub nshots: Option<u32>,
    /// Execution device.
    #[serde(default)]
    pub device: Option<DeviceInfo>,
    /// Wire token of the job status.
    #[serde(default)]
    pub status: Option<String>,
}

/// Device block nested in [`JobInfo`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g. `"sim"`, `"iqm5q"`).
    #[serde(default)]
    pub device: Option<String>,
    /// Laboratory hosting the device.
    #[serde(default)]
    pub lab_location: Option<String>,
}

/// Accept either a JSON string or a number as a pid.
fn pid_from_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "pid must be a string or a number, got {other}"
        ))),
    }
}
