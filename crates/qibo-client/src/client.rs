//! Entry point for talking to the QRC cluster.

use reqwest::Client as HttpClient;
use tracing::{debug, info, instrument};

use crate::api::{
    SubmitRequest, SubmitResponse, VersionResponse, check_keys, http_client, json_body,
    submit_url, version_url,
};
use crate::circuit::CircuitPayload;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::job::{JobResult, QiboJob};
use crate::poll::PollOptions;

/// Device used when none is given.
pub const DEFAULT_DEVICE: &str = "sim";

/// Shots used when none are given.
pub const DEFAULT_NSHOTS: u32 = 1000;

/// Authenticated client for the QRC cluster.
///
/// Construction checks that the server runs the circuit-library version
/// this client speaks.
pub struct Client {
    config: ClientConfig,
    base_url: String,
    token: String,
    http: HttpClient,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Client {
    /// Create a client and verify the server version.
    ///
    /// # Errors
    ///
    /// [`ClientError::VersionMismatch`] if the server reports a different
    /// circuit-library version than `config.qibo_version`.
    pub async fn new(config: ClientConfig, token: impl Into<String>) -> ClientResult<Self> {
        let client = Self::unchecked(config, token)?;
        client.check_client_server_qibo_versions().await?;
        Ok(client)
    }

    /// Create a client without contacting the server.
    pub fn unchecked(config: ClientConfig, token: impl Into<String>) -> ClientResult<Self> {
        config.validate()?;
        let http = http_client(&config)?;

        Ok(Self {
            base_url: config.base_url(),
            config,
            token: token.into(),
            http,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Circuit-library version installed on the server.
    pub async fn server_qibo_version(&self) -> ClientResult<String> {
        let url = version_url(&self.base_url);
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await?.error_for_status()?;
        let body = json_body(response).await?;
        check_keys(&body, &["qibo_version"])?;
        let reply: VersionResponse = serde_json::from_value(body)?;
        Ok(reply.qibo_version)
    }

    /// Fail unless the server's circuit-library version equals the local one.
    pub async fn check_client_server_qibo_versions(&self) -> ClientResult<()> {
        let server = self.server_qibo_version().await?;
        let local = &self.config.qibo_version;

        if *local != server {
            return Err(ClientError::VersionMismatch {
                local: local.clone(),
                server,
            });
        }
        debug!("Client and server Qibo versions match: {}", server);
        Ok(())
    }

    /// Post a circuit and return a handle on the new job.
    #[instrument(skip(self, circuit))]
    pub async fn run_circuit(
        &self,
        circuit: &CircuitPayload,
        nshots: u32,
        device: &str,
    ) -> ClientResult<QiboJob> {
        if nshots == 0 {
            return Err(ClientError::InvalidRequest("nshots must be positive".into()));
        }

        let url = submit_url(&self.base_url);
        let request = SubmitRequest {
            token: &self.token,
            circuit: circuit.as_value(),
            nshots,
            device,
        };
        info!("Post new circuit on the server");
        debug!("POST {} {:?}", url, request);

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let body = json_body(response).await?;
        check_keys(&body, &["pid", "message"])?;
        let reply: SubmitResponse = serde_json::from_value(body)?;

        info!("Job posted on server with pid {}", reply.pid);
        debug!("Server message: {}", reply.message);

        Ok(self
            .job(reply.pid)
            .with_circuit(circuit.clone())
            .with_nshots(nshots)
            .with_device(device))
    }

    /// Handle on a previously submitted job.
    pub fn job(&self, pid: impl Into<String>) -> QiboJob {
        QiboJob::with_http(pid, &self.config, self.http.clone())
    }

    /// Submit a circuit and wait for its result.
    pub async fn execute(
        &self,
        circuit: &CircuitPayload,
        nshots: u32,
        device: &str,
        options: &PollOptions,
    ) -> ClientResult<JobResult> {
        let mut job = self.run_circuit(circuit, nshots, device).await?;
        job.result(options).await
    }
}
