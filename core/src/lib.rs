//! Asynchronous client for a remote task-processing service.
//!
//! # Overview
//! Submits tasks identified by a type and an arbitrary JSON payload, fetches
//! their status and result, discovers supported task types and payload
//! schemas, and waits for a task to reach a terminal status with bounded
//! exponential backoff.
//!
//! # Design
//! - `TaskClient` holds only immutable configuration and a transport, so one
//!   client can serve any number of concurrent calls.
//! - Each operation is split into `build_*` (produces an `HttpRequest`) and
//!   `parse_*` (consumes an `HttpResponse`); the `Transport` trait performs
//!   the single exchange in between and is the seam tests replace.
//! - The client never runs task logic and never retries on its own, except
//!   that `wait_for_result` re-polls while a task is not yet finished.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;
pub mod wait;

pub use client::TaskClient;
pub use config::ClientOptions;
pub use error::{ErrorKind, TaskError};
pub use http::{exchange, HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use types::{
    CreateTaskRequest, FieldType, Outcome, PayloadField, SubmitResultRequest, SubmitResultResponse, Task,
    TaskPayloadSchema, TaskResult, TaskStatus,
};
pub use wait::{Backoff, WaitOptions};
