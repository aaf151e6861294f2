//! Retry policy applied to external service calls.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::ServiceError;

/// How often and how patiently a failing service call is retried.
///
/// Only [`ServiceError::Unavailable`] failures are retried. The default
/// policy makes a single attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }
}

impl RetryPolicy {
    pub fn exponential(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            multiplier: 2.0,
        }
    }

    /// Runs `call` until it succeeds, fails permanently, or the attempts run
    /// out.
    pub fn run<T>(
        &self,
        operation: &str,
        mut call: impl FnMut() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let attempts = self.max_attempts.max(1);
        let mut delay = self.initial_backoff;
        let mut attempt = 1;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = attempts,
                        error = %err,
                        "service call failed, retrying"
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    delay = delay.mul_f64(self.multiplier.max(1.0));
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn default_policy_makes_one_attempt() {
        let calls = Cell::new(0);
        let result: Result<(), _> = RetryPolicy::default().run("test", || {
            calls.set(calls.get() + 1);
            Err(ServiceError::Unavailable("down".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retries_transient_failures_until_success() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::exponential(3, Duration::ZERO);
        let result = policy.run("test", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(ServiceError::Unavailable("down".into()))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result, Ok(42));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn rejected_calls_are_not_retried() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::exponential(5, Duration::ZERO);
        let result: Result<(), _> = policy.run("test", || {
            calls.set(calls.get() + 1);
            Err(ServiceError::Rejected("bad input".into()))
        });
        assert_eq!(result, Err(ServiceError::Rejected("bad input".into())));
        assert_eq!(calls.get(), 1);
    }
}
