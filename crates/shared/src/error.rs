use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure payload carried inside a reply frame when the server rejects a
/// method call. `reason` is surfaced to callers verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<i64>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServerFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            error: None,
            reason: reason.into(),
            message: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("transport send failed: {0}")]
    Transport(String),
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("server rejected call: {reason}")]
    Server { reason: String },
    #[error("failed to decode reply: {0}")]
    Decode(String),
    /// Request id generation produced a collision with an outstanding call.
    /// This is a programming defect, not an expected runtime condition.
    #[error("duplicate request id: {0}")]
    DuplicateId(String),
}

impl From<ServerFailure> for DriverError {
    fn from(value: ServerFailure) -> Self {
        Self::Server {
            reason: value.reason,
        }
    }
}

pub type MethodResult<T> = Result<T, DriverError>;
