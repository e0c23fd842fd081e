//! Failure classification and retry with bounded exponential backoff.
//!
//! A transient failure is retried until either the attempt cap or the
//! wall-clock budget is exhausted, whichever comes first. Multipart
//! sub-operations share one budget through an explicit deadline.
//!
//! `Retry-After` response hints are deliberately not honored: throttling
//! responses (429/503) go through the same backoff policy as every other
//! transient failure.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::backend::{ClientError, ClientResult};
use crate::error::ErrorKind;

/// Base backoff delay for the first retry.
const BASE_DELAY_MS: u64 = 100;
/// Upper bound on any single backoff delay.
const MAX_DELAY_MS: u64 = 10_000;

/// Retryability of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Surface immediately on first occurrence
    NonRetryable,
    /// Retry with backoff while the budget lasts
    Transient,
}

/// Classify a transport failure.
///
/// Connection resets, early EOF, request timeouts, 5xx, 408 and 429 are
/// transient; semantic 4xx codes and missing objects are not.
pub fn classify(err: &ClientError) -> RetryClass {
    match err {
        ClientError::Timeout(_) | ClientError::Connection(_) | ClientError::EarlyEof(_) => {
            RetryClass::Transient
        }
        ClientError::Status { code, .. } => match *code {
            408 | 429 => RetryClass::Transient,
            code if code >= 500 => RetryClass::Transient,
            _ => RetryClass::NonRetryable,
        },
        ClientError::NotFound(_) | ClientError::Other(_) => RetryClass::NonRetryable,
    }
}

/// Classification tag carried by the terminal error.
pub fn kind_of(err: &ClientError) -> ErrorKind {
    match err {
        ClientError::Timeout(_) => ErrorKind::Timeout,
        ClientError::EarlyEof(_) => ErrorKind::EarlyEof,
        ClientError::Connection(_) => ErrorKind::ConnectionReset,
        ClientError::Status { code, .. } => ErrorKind::StatusCode(*code),
        ClientError::NotFound(_) => ErrorKind::NotFound,
        ClientError::Other(_) => ErrorKind::Other,
    }
}

/// Exponential backoff with jitter, seeded by the attempt count.
///
/// The delay lands uniformly in `[cap/2, cap]` where
/// `cap = min(BASE * 2^attempt, MAX)`.
fn backoff_delay(attempt: u32) -> Duration {
    let cap = BASE_DELAY_MS
        .saturating_mul(1u64 << attempt.min(16))
        .min(MAX_DELAY_MS);
    let jitter = rand::thread_rng().gen_range(0..=cap / 2);
    Duration::from_millis(cap / 2 + jitter)
}

/// Retry accounting for one logical operation.
#[derive(Debug)]
pub struct RetryState {
    attempts: u32,
    started: Instant,
    max_retries: u32,
    timeout: Duration,
    deadline: Option<Instant>,
}

impl RetryState {
    /// New state: up to `max_retries` retries (so `max_retries + 1`
    /// attempts) within `timeout` of wall-clock time.
    pub fn new(max_retries: u32, timeout: Duration) -> Self {
        Self {
            attempts: 0,
            started: Instant::now(),
            max_retries,
            timeout,
            deadline: None,
        }
    }

    /// Cap the state by an external deadline shared with sibling
    /// sub-operations of the same logical operation.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attempts performed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before the next retry, or `None` when the budget is spent.
    ///
    /// The delay is clamped to the remaining budget (and to the shared
    /// deadline), so retrying never sleeps past either.
    fn next_delay(&self) -> Option<Duration> {
        if self.attempts > self.max_retries {
            return None;
        }
        let elapsed = self.started.elapsed();
        if elapsed >= self.timeout {
            return None;
        }
        let mut remaining = self.timeout - elapsed;
        if let Some(deadline) = self.deadline {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            remaining = remaining.min(deadline - now);
        }
        Some(backoff_delay(self.attempts).min(remaining))
    }
}

/// Drive an operation to success or a terminal failure.
///
/// Returns the last underlying error verbatim; the caller attaches the
/// operation context and the classification tag.
pub async fn run<T, F, Fut>(state: &mut RetryState, mut op: F) -> ClientResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    loop {
        state.attempts += 1;
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match classify(&err) {
            RetryClass::NonRetryable => return Err(err),
            RetryClass::Transient => match state.next_delay() {
                Some(delay) => {
                    trace!(
                        "Transient failure on attempt {}, retrying in {:?}: {}",
                        state.attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    debug!(
                        "Retry budget exhausted after {} attempt(s): {}",
                        state.attempts, err
                    );
                    return Err(err);
                }
            },
        }
    }
}
