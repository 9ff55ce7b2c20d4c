//! Bounded retry with linear backoff.
//!
//! [`with_retry`] treats the wrapped task as opaque: every error is retried
//! the same way until the attempt budget runs out. Classification, where it
//! matters, happens in the caller by choosing what the task returns as an
//! error.

use std::io::Write;
use std::num::NonZeroU32;
use std::time::Duration;

use log::debug;

use crate::output::write_stderr_line;

/// Default number of attempts per operation.
pub const DEFAULT_ATTEMPTS: NonZeroU32 = NonZeroU32::MIN.saturating_add(2);

/// Default base delay between attempts.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Attempt budget and backoff step for one operation.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroU32;
/// use std::time::Duration;
/// use codexline_installer::retry::RetryPolicy;
///
/// let attempts = NonZeroU32::new(4).expect("non-zero");
/// let policy = RetryPolicy::new(attempts, Duration::from_millis(250));
/// assert_eq!(policy.delay_for(1), Duration::from_millis(250));
/// assert_eq!(policy.delay_for(3), Duration::from_millis(750));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: NonZeroU32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given budget and backoff step.
    #[must_use]
    pub const fn new(attempts: NonZeroU32, base_delay: Duration) -> Self {
        Self {
            attempts,
            base_delay,
        }
    }

    /// Total number of attempts, including the first.
    #[must_use]
    pub const fn attempts(&self) -> NonZeroU32 {
        self.attempts
    }

    /// Delay step multiplied by the failed attempt index.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay to wait after the 1-indexed attempt `attempt` has failed.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

/// Suspends the current flow between attempts.
#[cfg_attr(test, mockall::automock)]
pub trait Sleeper {
    /// Block for `duration`.
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Every attempt of an operation failed.
#[derive(Debug, thiserror::Error)]
#[error("{operation} failed after {attempts} attempt(s): {last}")]
pub struct RetryError<E: std::error::Error + 'static> {
    /// Name of the operation that was retried.
    pub operation: String,
    /// Number of attempts made.
    pub attempts: u32,
    /// Error from the final attempt.
    #[source]
    pub last: E,
}

/// Run `task` until it succeeds or `policy` runs out of attempts.
///
/// `task` receives the 1-indexed attempt number. After a failed attempt with
/// budget remaining, a warning naming the operation, the attempt and the
/// cause is written to `stderr` and `sleeper` waits for
/// [`RetryPolicy::delay_for`] that attempt. No wait follows the final failure.
///
/// # Errors
///
/// Returns [`RetryError`] carrying the last task error once every attempt
/// has failed.
pub fn with_retry<T, E, F>(
    operation: &str,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    stderr: &mut dyn Write,
    mut task: F,
) -> Result<T, RetryError<E>>
where
    E: std::error::Error + 'static,
    F: FnMut(u32) -> Result<T, E>,
{
    let total = policy.attempts().get();
    let mut attempt = 1;
    loop {
        debug!("{operation}: attempt {attempt}/{total}");
        let err = match task(attempt) {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if attempt >= total {
            return Err(RetryError {
                operation: operation.to_owned(),
                attempts: attempt,
                last: err,
            });
        }
        let delay = policy.delay_for(attempt);
        write_stderr_line(
            stderr,
            format!(
                "Warning: {operation} failed (attempt {attempt}/{total}): {err}; retrying in {} ms",
                delay.as_millis()
            ),
        );
        sleeper.sleep(delay);
        attempt += 1;
    }
}
