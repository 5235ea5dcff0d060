//! Polling a task until it reaches a terminal status.
//!
//! # Design
//! `wait_for_result` fetches the task, returns on `Completed`/`Failed`, and
//! otherwise sleeps for the next [`Backoff`] delay. The overall timeout is
//! checked after a fetch and before sleeping, so a task observed terminal is
//! always returned even right at the boundary.
//!
//! The timeout is cooperative. An in-flight fetch is never preempted; if the
//! client has no per-call timeout, a slow fetch can overrun the wait budget
//! and the overrun is only noticed once that fetch returns.
//!
//! Only a non-terminal status is retried. A transport error from any fetch
//! ends the wait immediately.

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::client::TaskClient;
use crate::error::TaskError;
use crate::http::Transport;
use crate::types::Task;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_FACTOR: f64 = 1.5;
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(5000);

/// Tuning for [`TaskClient::wait_for_result`]. `timeout: None` waits forever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitOptions {
    pub initial_delay: Duration,
    pub factor: f64,
    pub max_delay: Duration,
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            factor: DEFAULT_FACTOR,
            max_delay: DEFAULT_MAX_DELAY,
            timeout: None,
        }
    }
}

impl WaitOptions {
    /// Delays are scheduled in whole milliseconds; a sub-millisecond
    /// remainder rounds up, so a nonzero delay never becomes zero.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    /// Rounded up to whole milliseconds, like `initial_delay`.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_delay, self.factor, self.max_delay)
    }
}

/// Infinite schedule of polling delays in whole milliseconds.
///
/// Yields `initial` first, then `min(max, round(previous * factor))`.
/// Inputs are rounded up to the next millisecond. A zero initial delay
/// stays at zero forever.
#[derive(Debug, Clone)]
pub struct Backoff {
    next_ms: u64,
    factor: f64,
    max_ms: u64,
}

impl Backoff {
    pub fn new(initial: Duration, factor: f64, max: Duration) -> Self {
        Self {
            next_ms: duration_ms(initial),
            factor,
            max_ms: duration_ms(max),
        }
    }

    /// Current delay; advances the schedule. Never runs out.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next_ms;
        let grown = (current as f64 * self.factor).round();
        // NaN and negative factors collapse to zero.
        self.next_ms = if grown >= self.max_ms as f64 {
            self.max_ms
        } else if grown > 0.0 {
            grown as u64
        } else {
            0
        };
        Duration::from_millis(current)
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    let whole = duration.as_millis() + u128::from(duration.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(whole).unwrap_or(u64::MAX)
}

impl<T: Transport> TaskClient<T> {
    /// Poll `get_task(id)` until the task is `Completed` or `Failed`.
    ///
    /// Fails with `TaskError::WaitTimeout` when `options.timeout` has elapsed
    /// and the latest fetch still showed a non-terminal status. Any error from
    /// a fetch is returned as-is.
    pub async fn wait_for_result(&self, id: Uuid, options: WaitOptions) -> Result<Task, TaskError> {
        let start = Instant::now();
        let mut delays = options.backoff();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let task = self.get_task(id).await?;
            if task.is_terminal() {
                tracing::debug!(task_id = %id, status = ?task.status, attempt, "task finished");
                return Ok(task);
            }

            let elapsed = start.elapsed();
            if let Some(timeout) = options.timeout {
                if elapsed > timeout {
                    tracing::warn!(task_id = %id, status = ?task.status, ?elapsed, attempt, "gave up waiting for task");
                    return Err(TaskError::WaitTimeout { task_id: id, elapsed });
                }
            }

            let delay = delays.next_delay();
            tracing::debug!(task_id = %id, status = ?task.status, attempt, ?delay, "task not finished, backing off");
            tokio::time::sleep(delay).await;
        }
    }
}
