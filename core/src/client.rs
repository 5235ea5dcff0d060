//! Task service client: request builders, response parsers and the async
//! operations that join them through a [`Transport`].
//!
//! # Design
//! `TaskClient` holds only immutable configuration (base address, default
//! headers, default timeout) and a transport. Each operation is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`; the async method of the same name runs
//! one exchange in between. Concurrent calls share nothing mutable.
//!
//! The client is a pass-through: it performs no validation of task types or
//! payloads and does not special-case any status code.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::ClientOptions;
use crate::error::TaskError;
use crate::http::{exchange, HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::types::{
    CreateTaskRequest, SubmitResultRequest, SubmitResultResponse, Task, TaskPayloadSchema,
};

/// Asynchronous client for the task service.
#[derive(Debug, Clone)]
pub struct TaskClient<T = ReqwestTransport> {
    base_url: String,
    headers: Vec<(String, String)>,
    timeout: Option<std::time::Duration>,
    transport: T,
}

impl TaskClient<ReqwestTransport> {
    pub fn new(options: ClientOptions) -> Self {
        Self::with_transport(options, ReqwestTransport::new())
    }
}

impl<T> TaskClient<T> {
    pub fn with_transport(options: ClientOptions, transport: T) -> Self {
        let headers = if options.headers.is_empty() {
            vec![("content-type".to_string(), "application/json".to_string())]
        } else {
            options.headers
        };
        Self {
            base_url: options.base_url.trim_end_matches('/').to_string(),
            headers,
            timeout: options.timeout,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn build_create_task(&self, task_type: &str, payload: Value) -> Result<HttpRequest, TaskError> {
        let body = CreateTaskRequest {
            task_type: task_type.to_string(),
            payload,
        };
        self.request_with_body(HttpMethod::Post, "/task", &body)
    }

    pub fn build_get_task(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/task/{id}"))
    }

    pub fn build_list_task_types(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/task/types")
    }

    pub fn build_get_payload_schema(&self, task_type: &str) -> HttpRequest {
        let task_type = urlencoding::encode(task_type);
        self.request(HttpMethod::Get, &format!("/task/types/{task_type}/schema"))
    }

    pub fn build_submit_result(&self, id: Uuid, result: &SubmitResultRequest) -> Result<HttpRequest, TaskError> {
        self.request_with_body(HttpMethod::Post, &format!("/task/{id}/result"), result)
    }

    pub fn parse_create_task(&self, response: HttpResponse) -> Result<Task, TaskError> {
        parse_json(response)
    }

    pub fn parse_get_task(&self, response: HttpResponse) -> Result<Task, TaskError> {
        parse_json(response)
    }

    pub fn parse_list_task_types(&self, response: HttpResponse) -> Result<Vec<String>, TaskError> {
        parse_json(response)
    }

    pub fn parse_get_payload_schema(&self, response: HttpResponse) -> Result<TaskPayloadSchema, TaskError> {
        parse_json(response)
    }

    pub fn parse_submit_result(&self, response: HttpResponse) -> Result<SubmitResultResponse, TaskError> {
        parse_json(response)
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers: self.headers.clone(),
            body: None,
            timeout: self.timeout,
        }
    }

    fn request_with_body<B: Serialize>(&self, method: HttpMethod, path: &str, body: &B) -> Result<HttpRequest, TaskError> {
        let body = serde_json::to_string(body).map_err(|e| TaskError::Encode { detail: e.to_string() })?;
        let mut request = self.request(method, path);
        request.body = Some(body);
        Ok(request)
    }
}

impl<T: Transport> TaskClient<T> {
    /// Submit a new task. The server assigns its id and initial status.
    pub async fn create_task(&self, task_type: &str, payload: Value) -> Result<Task, TaskError> {
        let request = self.build_create_task(task_type, payload)?;
        let task = self.parse_create_task(exchange(&self.transport, request).await?)?;
        tracing::debug!(task_id = %task.id, task_type, status = ?task.status, "task created");
        Ok(task)
    }

    /// Fetch the current state of a task. An unknown id surfaces as the
    /// server's `HttpStatus` error, unchanged.
    pub async fn get_task(&self, id: Uuid) -> Result<Task, TaskError> {
        let request = self.build_get_task(id);
        self.parse_get_task(exchange(&self.transport, request).await?)
    }

    /// Task types the service accepts, in the order the server lists them.
    pub async fn list_task_types(&self) -> Result<Vec<String>, TaskError> {
        let request = self.build_list_task_types();
        self.parse_list_task_types(exchange(&self.transport, request).await?)
    }

    pub async fn get_payload_schema(&self, task_type: &str) -> Result<TaskPayloadSchema, TaskError> {
        let request = self.build_get_payload_schema(task_type);
        self.parse_get_payload_schema(exchange(&self.transport, request).await?)
    }

    /// Report a task's outcome, as a worker would.
    pub async fn submit_result(&self, id: Uuid, result: &SubmitResultRequest) -> Result<SubmitResultResponse, TaskError> {
        let request = self.build_submit_result(id, result)?;
        self.parse_submit_result(exchange(&self.transport, request).await?)
    }
}

/// Fail on any non-2xx status, otherwise decode the body as `R`.
fn parse_json<R: DeserializeOwned>(response: HttpResponse) -> Result<R, TaskError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| TaskError::Decode { detail: e.to_string() })
}

/// Map a non-success status to `TaskError::HttpStatus`. The message is the
/// response body, or the canonical reason phrase when the body is empty.
fn check_status(response: &HttpResponse) -> Result<(), TaskError> {
    if response.is_success() {
        return Ok(());
    }
    let body = response.body.trim();
    let message = if body.is_empty() {
        reqwest::StatusCode::from_u16(response.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("unknown status")
            .to_string()
    } else {
        body.to_string()
    };
    Err(TaskError::HttpStatus {
        code: response.status,
        message,
    })
}
