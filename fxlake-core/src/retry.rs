//! Fixed-delay retry policy for the extract stage.
//!
//! The policy owns no clock; callers pass a [`Sleeper`] so tests can record
//! delays instead of waiting for them.

use crate::error::EtlError;
use std::time::Duration;
use tracing::warn;

/// Something that can block the current thread for a duration.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Retry configuration: total attempts and the fixed pause between them.
///
/// `max_attempts` counts every call, including the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Run `op` until it succeeds, returns a non-retryable error, or the
    /// attempt budget is spent. The last error is returned on exhaustion,
    /// annotated with the attempt count.
    pub fn run<T, F>(&self, sleeper: &dyn Sleeper, mut op: F) -> Result<T, EtlError>
    where
        F: FnMut(u32) -> Result<T, EtlError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= attempts => {
                    return Err(match e {
                        EtlError::RemoteFetch(msg) => EtlError::RemoteFetch(format!(
                            "giving up after {attempts} attempt(s): {msg}"
                        )),
                        other => other,
                    });
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        delay_secs = self.delay.as_secs_f64(),
                        error = %e,
                        "attempt failed, retrying"
                    );
                    sleeper.sleep(self.delay);
                    attempt += 1;
                }
            }
        }
    }
}
