//! Caller-side retry for read operations.
//!
//! The feed core never retries. Reads (discovery, version listing) go through
//! [`with_retry`] here; push and delete never do.

use log::{debug, warn};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{DiscoveryError, FeedError};

/// Maximum number of attempts for a read.
pub const MAX_ATTEMPTS: usize = 3;

const RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Whether a failure might go away if the same request is repeated.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for FeedError {
    /// Connection-level failures and 5xx responses. Client errors, parse
    /// failures and cancellation are final.
    fn is_transient(&self) -> bool {
        match self {
            FeedError::Transport { status: None, .. } => true,
            FeedError::Transport {
                status: Some(status),
                ..
            } => *status >= 500,
            FeedError::Malformed { .. } | FeedError::Cancelled => false,
        }
    }
}

impl Transient for DiscoveryError {
    fn is_transient(&self) -> bool {
        match self {
            DiscoveryError::Unreachable { source, .. } => source.is_transient(),
            DiscoveryError::MissingService(_) | DiscoveryError::Cancelled => false,
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or
/// runs out of attempts. Cancellation during the wait between attempts
/// returns the last failure.
pub async fn with_retry<F, Fut, T, E>(
    operation_name: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_transient() {
            debug!("{}: non-retryable error: {}", operation_name, error);
            return Err(error);
        }
        if attempt >= attempts {
            warn!("{}: giving up after {} attempt(s)", operation_name, attempt);
            return Err(error);
        }

        warn!(
            "{}: attempt {}/{} failed ({}), retrying in {:?}...",
            operation_name, attempt, attempts, error, policy.delay
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(error),
            _ = tokio::time::sleep(policy.delay) => {}
        }
        attempt += 1;
    }
}
