//! Call-scoped deadlines
//!
//! Every collection operation starts its own [`Deadline`] on entry and runs
//! the driver future inside it. A deadline is a plain `Copy` value owned by
//! that one call, so concurrent calls cannot replace or extend each other's
//! time window. When the window closes first, the driver future is dropped,
//! and with it any cursor the call had open.

use cnct_core::{CnctError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Expiry used when `now + timeout` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// The time window of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    operation: &'static str,
    timeout: Duration,
    expires_at: Instant,
}

impl Deadline {
    /// Start a window of `timeout` for `operation`, measured from now
    ///
    /// Timeouts too large to represent, such as `Duration::MAX`, close the
    /// window thirty years out.
    pub fn start(operation: &'static str, timeout: Duration) -> Self {
        let now = Instant::now();
        let expires_at = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self {
            operation,
            timeout,
            expires_at,
        }
    }

    /// Name of the operation this deadline bounds
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// The configured length of the window
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The configured length in whole milliseconds, saturating at `u64::MAX`
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Instant at which the window closes
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Time left before the window closes, zero once expired
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// The error reported when this window closes
    pub fn elapsed_error(&self) -> CnctError {
        CnctError::Timeout {
            operation: self.operation,
            timeout: self.timeout,
        }
    }

    /// Drive `future` to completion unless the window closes first
    ///
    /// On expiry the future is dropped before this returns.
    pub async fn run<F, T>(self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout_at(self.expires_at, future).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation = self.operation,
                    timeout_ms = self.timeout_ms(),
                    "operation deadline elapsed"
                );
                Err(self.elapsed_error())
            }
        }
    }
}
