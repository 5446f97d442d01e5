//! Job status model.
//!
//! The server reports job progress as string tokens:
//!
//! ```text
//!   "to_do" ──→ "in_progress" ──→ "success"
//!                     │
//!                     └─────────→ "error"
//! ```
//!
//! `success` and `error` are terminal. Any other token maps to `None`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status of a job on the QRC cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// Job is waiting in queue (`"to_do"`).
    #[serde(rename = "to_do")]
    Queued,
    /// Job is executing (`"in_progress"`).
    #[serde(rename = "in_progress")]
    Running,
    /// Job completed successfully (`"success"`).
    #[serde(rename = "success")]
    Done,
    /// Job finished with an error (`"error"`).
    #[serde(rename = "error")]
    Error,
}

impl JobStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Done,
        JobStatus::Error,
    ];

    /// The token the server uses for this status.
    pub fn as_wire(self) -> &'static str {
        match self {
            JobStatus::Queued => "to_do",
            JobStatus::Running => "in_progress",
            JobStatus::Done => "success",
            JobStatus::Error => "error",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "Queued"),
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Done => write!(f, "Done"),
            JobStatus::Error => write!(f, "Error"),
        }
    }
}

/// Map a wire token to a [`JobStatus`].
///
/// Total over the four valid tokens; returns `None` for anything else.
pub fn parse_status(token: &str) -> Option<JobStatus> {
    JobStatus::ALL.into_iter().find(|s| s.as_wire() == token)
}

/// Error returned when parsing an unrecognized status token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status token: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// The job handle's view of the remote status.
///
/// Keeps "never asked" apart from "asked, but the answer was not a status".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachedStatus {
    /// No status has been fetched from the server yet.
    #[default]
    Unfetched,
    /// The server answered without a recognizable status token.
    Unrecognized,
    /// Last status reported by the server.
    Known(JobStatus),
}

impl CachedStatus {
    /// Build the cache entry for a freshly fetched (possibly absent) token.
    pub fn from_token(token: Option<&str>) -> Self {
        match token.and_then(parse_status) {
            Some(status) => CachedStatus::Known(status),
            None => CachedStatus::Unrecognized,
        }
    }

    /// The known status, if any.
    pub fn known(self) -> Option<JobStatus> {
        match self {
            CachedStatus::Known(status) => Some(status),
            CachedStatus::Unfetched | CachedStatus::Unrecognized => None,
        }
    }

    /// Whether the server has been asked at least once.
    pub fn is_fetched(self) -> bool {
        !matches!(self, CachedStatus::Unfetched)
    }
}
