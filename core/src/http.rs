//! HTTP transport types and the transport adapter.
//!
//! # Design
//! Requests and responses are plain data. `TaskClient` builds `HttpRequest`
//! values and parses `HttpResponse` values; a [`Transport`] performs the one
//! network exchange in between. Keeping the I/O behind a trait lets tests
//! script the service's answers without opening a socket.
//!
//! A transport never retries and never interprets the status code. Status
//! classification and JSON decoding belong to the parse step, and the
//! per-request deadline is enforced by [`exchange`] around the whole send.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TaskError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An HTTP request described as plain data.
///
/// `url` is absolute, already resolved against the client's base address.
/// `timeout`, when set, bounds connect, send and receive together.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs exactly one request/response exchange.
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status, and `Err` only when no response was obtained.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TaskError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TaskError> {
        (**self).send(request).await
    }
}

/// Send `request` through `transport`, failing with `TaskError::Timeout`
/// once the request's deadline elapses, whatever stage the exchange is in.
pub async fn exchange<T>(transport: &T, request: HttpRequest) -> Result<HttpResponse, TaskError>
where
    T: Transport + ?Sized,
{
    let method = request.method;
    let url = request.url.clone();
    let response = match request.timeout {
        Some(after) => tokio::time::timeout(after, transport.send(request))
            .await
            .map_err(|_| TaskError::Timeout { after })??,
        None => transport.send(request).await?,
    };
    tracing::debug!(?method, %url, status = response.status, "exchange complete");
    Ok(response)
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TaskError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(&request.url),
            HttpMethod::Post => self.http.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let deadline = request.timeout;
        if let Some(after) = deadline {
            builder = builder.timeout(after);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| TaskError::from_reqwest(err, deadline))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|err| TaskError::from_reqwest(err, deadline))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stalled;

    #[async_trait]
    impl Transport for Stalled {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TaskError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: "{}".to_string(),
            })
        }
    }

    struct Refused;

    #[async_trait]
    impl Transport for Refused {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TaskError> {
            Err(TaskError::Network {
                detail: "connection refused".to_string(),
            })
        }
    }

    fn request(timeout: Option<Duration>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost:3000/task/types".to_string(),
            headers: Vec::new(),
            body: None,
            timeout,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_a_stalled_exchange() {
        let err = exchange(&Stalled, request(Some(Duration::from_millis(200))))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Timeout { after } if after == Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn transport_failure_passes_through() {
        let err = exchange(&Refused, request(Some(Duration::from_secs(1))))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Network { .. }));
    }

    #[test]
    fn success_range_is_2xx() {
        let mut response = HttpResponse {
            status: 201,
            headers: Vec::new(),
            body: String::new(),
        };
        assert!(response.is_success());
        response.status = 304;
        assert!(!response.is_success());
    }
}
