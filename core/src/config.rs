//! Construction-time configuration for `TaskClient`.

use std::time::Duration;

/// Environment variable holding the service's base address.
pub const BASE_URL_ENV: &str = "TASKQ_BASE_URL";
/// Environment variable holding the default per-call timeout in milliseconds.
pub const TIMEOUT_MS_ENV: &str = "TASKQ_TIMEOUT_MS";

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Connection settings shared by every call a client makes.
///
/// An empty header set is replaced by `content-type: application/json`
/// when the client is built. `timeout: None` means calls are unbounded.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            headers: Vec::new(),
        }
    }

    /// Read `TASKQ_BASE_URL` and `TASKQ_TIMEOUT_MS`. A timeout that does not
    /// parse as milliseconds is ignored.
    pub fn from_env() -> Self {
        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout = std::env::var(TIMEOUT_MS_ENV)
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_millis);
        Self {
            base_url,
            timeout,
            headers: Vec::new(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a default header. Any header set replaces the JSON content-type
    /// default entirely, so add `content-type: application/json` yourself
    /// when the service requires it on bodies.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
