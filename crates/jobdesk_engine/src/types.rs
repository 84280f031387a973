use std::fmt;

use jobdesk_core::{ServerProgress, TerminalStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const STATUS_SUCCESS: &str = "success";
const STATUS_ERROR: &str = "error";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "invalid response body"),
        }
    }
}

/// Why a user-triggered operation did not produce its result.
/// The user has already been notified when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("server rejected the request: {0}")]
    Rejected(String),
    #[error("operation ended without success")]
    Unsuccessful,
    #[error("no targets selected")]
    NoTargets,
}

/// Response of `POST /api/check_updates`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub update_available: bool,
    #[serde(default)]
    pub latest_version: Option<String>,
    #[serde(default)]
    pub current_version: Option<String>,
}

impl UpdateStatus {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Response of `POST /fetch_new_data`. Jobs are passed through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FetchResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub jobs: Vec<serde_json::Value>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Response of `POST /bulk_apply`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkApplyResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
}

impl BulkApplyResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// One `data:` payload of `GET /bulk_apply_progress`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressEventPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress_percent: f64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    #[serde(default)]
    pub status: Option<String>,
}

/// `null` decodes like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ProgressEventPayload {
    pub fn into_progress(self) -> ServerProgress {
        let percent = self.progress_percent.round().clamp(0.0, 100.0) as u8;
        let status = match self.status.as_deref() {
            Some(STATUS_SUCCESS) => Some(TerminalStatus::Success),
            Some(STATUS_ERROR) => Some(TerminalStatus::Failure),
            _ => None,
        };
        ServerProgress {
            percent,
            message: self.message,
            completed: self.completed,
            status,
        }
    }
}
