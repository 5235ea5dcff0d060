//! Error types for the task service client.
//!
//! # Design
//! Every failure carries a machine-readable kind plus the detail a human
//! needs. "Task not found" is an `HttpStatus` with code 404, "service
//! unreachable" is `Network`, and "gave up waiting" is `WaitTimeout`; callers
//! tell them apart with [`TaskError::kind`] rather than by inspecting strings.
//!
//! The two timeout flavors are kept apart: `Timeout` bounds a single exchange,
//! `WaitTimeout` is the cumulative polling budget of `wait_for_result`.

use std::time::Duration;

use uuid::Uuid;

/// Errors returned by `TaskClient` operations and the transport.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Connection, DNS or other lower-level transport failure.
    #[error("network error: {detail}")]
    Network { detail: String },

    /// The server answered with a non-2xx status.
    #[error("HTTP {code}: {message}")]
    HttpStatus { code: u16, message: String },

    /// The response body could not be decoded into the expected shape.
    #[error("decode failed: {detail}")]
    Decode { detail: String },

    /// The request body could not be encoded to JSON.
    #[error("encode failed: {detail}")]
    Encode { detail: String },

    /// A single exchange exceeded its deadline.
    #[error("request timed out after {after:?}")]
    Timeout { after: Duration },

    /// `wait_for_result` ran out of polling budget before the task finished.
    #[error("gave up waiting for task {task_id} after {elapsed:?}")]
    WaitTimeout { task_id: Uuid, elapsed: Duration },
}

/// Fieldless discriminant of [`TaskError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    HttpStatus,
    Decode,
    Encode,
    Timeout,
    WaitTimeout,
}

impl TaskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::Network { .. } => ErrorKind::Network,
            TaskError::HttpStatus { .. } => ErrorKind::HttpStatus,
            TaskError::Decode { .. } => ErrorKind::Decode,
            TaskError::Encode { .. } => ErrorKind::Encode,
            TaskError::Timeout { .. } => ErrorKind::Timeout,
            TaskError::WaitTimeout { .. } => ErrorKind::WaitTimeout,
        }
    }

    /// Status code of an `HttpStatus` error, if this is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TaskError::HttpStatus { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True for an `HttpStatus` error carrying 404.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// True for either timeout flavor.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TaskError::Timeout { .. } | TaskError::WaitTimeout { .. })
    }
}

impl TaskError {
    /// Classify a reqwest failure. A timeout wins over the other flags: reqwest
    /// marks a body read cut short by the deadline as both timeout and decode.
    pub(crate) fn from_reqwest(err: reqwest::Error, deadline: Option<Duration>) -> Self {
        match deadline {
            Some(after) if err.is_timeout() => TaskError::Timeout { after },
            _ if err.is_decode() => TaskError::Decode {
                detail: err.to_string(),
            },
            _ => TaskError::Network {
                detail: err.to_string(),
            },
        }
    }
}
