//! Retry policy types.
//!
//! A [`RetryPolicy`] decides how many times a failed tile request is
//! re-issued and how long to wait before each retry.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tilewarm::retry::RetryPolicy;
//!
//! // Two retries, waiting 500ms then 1000ms
//! let policy = RetryPolicy::linear(2, Duration::from_millis(500));
//! assert_eq!(policy.max_attempts(), 3);
//! assert_eq!(policy.delay_for_retry(1), Some(Duration::from_millis(500)));
//! assert_eq!(policy.delay_for_retry(2), Some(Duration::from_millis(1000)));
//! assert_eq!(policy.delay_for_retry(3), None);
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// =============================================================================
// Retry Policy Constants
// =============================================================================

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default base delay for linear backoff (500ms).
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

/// Default maximum delay for exponential backoff (30 seconds).
pub const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// Default multiplier for exponential backoff.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Backoff strategy named in configuration (`linear`, `fixed`, `exponential`).
///
/// Combined with a retry budget and a base delay by
/// [`RetryPolicy::from_backoff`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Retry `n` waits `n × base`.
    #[default]
    Linear,
    /// Every retry waits `base`.
    Fixed,
    /// Retry `n` waits `base × 2^(n-1)`, capped at [`DEFAULT_MAX_DELAY_SECS`].
    Exponential,
}

impl FromStr for Backoff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "fixed" => Ok(Self::Fixed),
            "exponential" => Ok(Self::Exponential),
            other => Err(format!(
                "unknown backoff '{}': expected linear, fixed or exponential",
                other
            )),
        }
    }
}

impl fmt::Display for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Linear => "linear",
            Self::Fixed => "fixed",
            Self::Exponential => "exponential",
        };
        f.write_str(name)
    }
}

/// How a tile request handles failures.
///
/// All variants count retries, not attempts: the first attempt is free, so a
/// policy with `max_retries = 2` makes at most three attempts.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum RetryPolicy {
    /// No retries - the first failure is final.
    #[default]
    None,

    /// Constant delay between attempts.
    Fixed {
        /// Retries allowed after the first attempt.
        max_retries: u32,
        /// Delay before every retry.
        delay: Duration,
    },

    /// Delay grows linearly with the retry index: `base`, `2 × base`, ...
    Linear {
        /// Retries allowed after the first attempt.
        max_retries: u32,
        /// Delay before the first retry.
        base: Duration,
    },

    /// Exponential backoff, capped at `max_delay`.
    ExponentialBackoff {
        /// Retries allowed after the first attempt.
        max_retries: u32,
        /// Delay before the first retry.
        initial_delay: Duration,
        /// Maximum delay cap (delay won't exceed this).
        max_delay: Duration,
        /// Multiplier applied to delay after each failure (typically 2.0).
        multiplier: f64,
    },
}

impl RetryPolicy {
    /// Creates a linear backoff policy.
    ///
    /// # Arguments
    ///
    /// * `max_retries` - Retries allowed after the first attempt
    /// * `base` - Delay before the first retry
    pub fn linear(max_retries: u32, base: Duration) -> Self {
        Self::Linear { max_retries, base }
    }

    /// Creates a fixed-delay policy.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self::Fixed { max_retries, delay }
    }

    /// Creates an exponential backoff policy with default cap and multiplier.
    pub fn exponential(max_retries: u32, initial_delay: Duration) -> Self {
        Self::ExponentialBackoff {
            max_retries,
            initial_delay,
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Builds the policy for a configured backoff strategy.
    ///
    /// A zero retry budget yields [`RetryPolicy::None`] whatever the strategy.
    pub fn from_backoff(backoff: Backoff, max_retries: u32, base: Duration) -> Self {
        if max_retries == 0 {
            return Self::None;
        }
        match backoff {
            Backoff::Linear => Self::linear(max_retries, base),
            Backoff::Fixed => Self::fixed(max_retries, base),
            Backoff::Exponential => Self::exponential(max_retries, base),
        }
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Fixed { max_retries, .. }
            | Self::Linear { max_retries, .. }
            | Self::ExponentialBackoff { max_retries, .. } => *max_retries,
        }
    }

    /// Maximum number of attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries().saturating_add(1)
    }

    /// Calculates the delay before a given retry.
    ///
    /// # Arguments
    ///
    /// * `retry` - The retry number (1-based, where 1 is the first retry)
    ///
    /// # Returns
    ///
    /// The delay to wait before the retry, or `None` if the retry budget is
    /// exhausted.
    pub fn delay_for_retry(&self, retry: u32) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries() {
            return None;
        }

        match self {
            Self::None => None,
            Self::Fixed { delay, .. } => Some(*delay),
            Self::Linear { base, .. } => Some(base.saturating_mul(retry)),
            Self::ExponentialBackoff {
                initial_delay,
                max_delay,
                multiplier,
                ..
            } => {
                let factor = multiplier.powi((retry - 1) as i32);
                let delay_ms = initial_delay.as_millis() as f64 * factor;
                let capped = delay_ms.min(max_delay.as_millis() as f64);
                Some(Duration::from_millis(capped as u64))
            }
        }
    }
}
