//! Retry budget and backoff for connection failures.
//!
//! Only connection-level failures (DNS, socket, timeout) consume the retry
//! budget. HTTP failures are handed to the request's
//! [`ErrorHook`](crate::ErrorHook) instead, and are never retried by count.

use rand::Rng;
use std::time::Duration;

/// Number of connection retries allowed by default.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// How long to wait before resending after a connection failure.
///
/// # Examples
///
/// ```
/// use feedly_client::retry::Backoff;
/// use std::time::Duration;
///
/// // Resend immediately
/// let immediate = Backoff::None;
///
/// // 100ms, 200ms, 400ms, 800ms...
/// let exponential = Backoff::Exponential {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(30),
///     jitter: true,
/// };
///
/// // 1s, 1s, 1s...
/// let linear = Backoff::Linear {
///     delay: Duration::from_secs(1),
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub enum Backoff {
    /// Resend right away.
    #[default]
    None,

    /// Wait `initial_delay * 2^(retry - 1)`, capped at `max_delay`.
    ///
    /// Optional jitter adds randomness to prevent thundering herd.
    Exponential {
        /// The delay before the first retry.
        initial_delay: Duration,
        /// The maximum delay between retries.
        max_delay: Duration,
        /// Whether to add random jitter to delays.
        jitter: bool,
    },

    /// Wait the same delay before every retry.
    Linear {
        /// The delay between attempts.
        delay: Duration,
    },
}

impl Backoff {
    /// Returns the delay before the given retry, or `None` to resend at once.
    ///
    /// # Arguments
    ///
    /// * `retry` - The retry number (1-indexed, so 1 = first retry)
    pub fn delay_for_retry(&self, retry: usize) -> Option<Duration> {
        match self {
            Backoff::None => None,
            Backoff::Exponential {
                initial_delay,
                max_delay,
                jitter,
            } => {
                let exponent = u32::try_from(retry.saturating_sub(1)).unwrap_or(u32::MAX);
                let multiplier = 2u32.saturating_pow(exponent);
                let delay = initial_delay.saturating_mul(multiplier).min(*max_delay);

                if *jitter {
                    // between 50% and 100% of the delay
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    Some(delay.mul_f64(jitter_factor))
                } else {
                    Some(delay)
                }
            }
            Backoff::Linear { delay } => Some(*delay),
        }
    }
}

/// The connection retry budget of a client.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Connection retries allowed after the first attempt.
    pub max_retries: usize,
    /// Wait between retries.
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Backoff::None,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Backoff::None,
        }
    }

    /// Returns `true` if another retry fits in a budget of `max_retries`
    /// after `retries_so_far` retries.
    pub fn allows(max_retries: usize, retries_so_far: usize) -> bool {
        retries_so_far < max_retries
    }
}
