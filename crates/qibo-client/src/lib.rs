//! Qibo client for the QRC cluster
//!
//! This crate submits quantum circuits to a remote execution service and
//! retrieves their results.
//!
//! # Overview
//!
//! - [`Client`] posts circuits and checks that client and server agree on
//!   the circuit-library version.
//! - [`QiboJob`] tracks one job by its `pid`: status queries, full info
//!   refresh, and result retrieval.
//! - Result retrieval polls the result endpoint until its `Job-Status`
//!   header is terminal, unpacks the gzip-compressed tar body into
//!   `<results_root>/<pid>/`, and decodes `results.npy` into a
//!   [`QuantumState`].
//!
//! # Job lifecycle
//!
//! ```text
//!   run_circuit() ──→ Queued ──→ Running ──→ Done
//!                                   │
//!                                   └──────→ Error
//! ```
//!
//! # Example
//!
//! ```ignore
//! use qibo_client::{CircuitPayload, Client, ClientConfig, PollOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::load()?;
//!     let client = Client::new(config, std::env::var("QIBO_CLIENT_TOKEN")?).await?;
//!
//!     let circuit = CircuitPayload::from_file("bell.json")?;
//!     let mut job = client.run_circuit(&circuit, 1000, "sim").await?;
//!     println!("Job: {}", job.pid());
//!
//!     let result = job.result(&PollOptions::from_config(client.config())).await?;
//!     if result.is_success() {
//!         println!("{result}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod archive;
pub mod circuit;
pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod payload;
pub mod poll;
pub mod status;

pub use archive::{ArchiveError, ArchiveResult, unpack_byte_stream_to_folder, unpack_stream_to_folder};
pub use circuit::CircuitPayload;
pub use client::{Client, DEFAULT_DEVICE, DEFAULT_NSHOTS};
pub use config::{ClientConfig, QIBO_VERSION};
pub use error::{ClientError, ClientResult};
pub use job::{JobResult, QiboJob};
pub use payload::{QuantumState, RESULTS_FILE_NAME, load_payload};
pub use poll::{PollOptions, poll_until_terminal, wait_for_terminal_status};
pub use status::{CachedStatus, JobStatus, UnknownStatus, parse_status};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
