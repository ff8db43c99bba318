//! Policy types for install scheduling.
//!
//! - [`RetryPolicy`]: how a failed install attempt is retried
//! - [`Priority`]: install ordering (higher = installed earlier)
//!
//! # Example
//!
//! ```ignore
//! use setupkit::orchestrator::{Priority, RetryPolicy};
//!
//! // One initial attempt plus two retries, 2s apart
//! let retry = RetryPolicy::fixed(2, Duration::from_secs(2));
//!
//! // Drivers go before everything else
//! let driver = Priority::SYSTEM;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// Retry Policy Constants
// =============================================================================

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default delay between attempts (2 seconds).
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

// =============================================================================
// Priority Constants
// =============================================================================

/// Priority for drivers and runtimes other products may rely on.
pub const PRIORITY_SYSTEM: i32 = 100;

/// Priority for ordinary applications.
pub const PRIORITY_NORMAL: i32 = 0;

/// Priority for optional extras.
pub const PRIORITY_OPTIONAL: i32 = -50;

/// How a failed install attempt is retried.
///
/// Retry counts here exclude the initial attempt: `Fixed { max_retries: 1, .. }`
/// means at most two attempts in total.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryPolicy {
    /// No retries - the first result is final.
    None,

    /// Fixed number of retries with a constant delay between attempts.
    Fixed {
        /// Maximum number of retries after the initial attempt.
        max_retries: u32,
        /// Delay before each retry.
        delay: Duration,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(
            DEFAULT_MAX_RETRIES,
            Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        )
    }
}

impl RetryPolicy {
    /// Creates a fixed-delay retry policy.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self::Fixed { max_retries, delay }
    }

    /// Delay before retry number `retry` (1-based).
    ///
    /// Returns `None` once the retry budget is spent.
    pub fn delay_for_retry(&self, retry: u32) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries() {
            return None;
        }

        match self {
            Self::None => None,
            Self::Fixed { delay, .. } => Some(*delay),
        }
    }

    /// Maximum number of retries after the initial attempt.
    pub fn max_retries(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Fixed { max_retries, .. } => *max_retries,
        }
    }

    /// Maximum number of attempts, initial one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries() + 1
    }
}

/// Install priority.
///
/// Larger values are installed first. Entries with equal priority keep
/// their catalog order.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    /// Drivers and shared runtimes.
    pub const SYSTEM: Priority = Priority(PRIORITY_SYSTEM);

    /// Ordinary applications (the default).
    pub const NORMAL: Priority = Priority(PRIORITY_NORMAL);

    /// Optional extras.
    pub const OPTIONAL: Priority = Priority(PRIORITY_OPTIONAL);

    /// Creates a priority with the given value.
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::SYSTEM => write!(f, "System(100)"),
            Self::NORMAL => write!(f, "Normal(0)"),
            Self::OPTIONAL => write!(f, "Optional(-50)"),
            Self(v) => write!(f, "Priority({})", v),
        }
    }
}
