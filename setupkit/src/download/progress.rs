//! Progress reporting for payload downloads.
//!
//! Chunk reads arrive far more often than any consumer wants to hear about
//! them, so fetch progress goes through a [`ProgressThrottle`] that lets at
//! most one report through per interval.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::error::DownloadError;

/// Default minimum interval between progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Progress callback for a single fetch.
///
/// # Arguments
///
/// * `bytes_transferred` - Bytes written so far
/// * `bytes_total` - Total size, if the server reported one
/// * `speed` - Instantaneous speed in bytes per second
pub type FetchProgressCallback = Box<dyn Fn(u64, Option<u64>, f64) + Send + Sync>;

/// Progress callback for a bounded batch of fetches.
///
/// # Arguments
///
/// * `completed` - Number of entries resolved so far (strictly increasing)
/// * `total` - Number of entries in the batch
/// * `id` - Identifier of the entry that just resolved
/// * `result` - Outcome of that entry
pub type BatchProgressCallback =
    Box<dyn Fn(usize, usize, &str, &Result<PathBuf, DownloadError>) + Send + Sync>;

/// Rate limiter for progress reports.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl ProgressThrottle {
    /// Create a throttle with the given minimum interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    /// Returns true if a report may be emitted now, and records it.
    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    fn ready_at(&mut self, now: Instant) -> bool {
        match self.last_emit {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}
