//! Per-fetch download state.
//!
//! A [`DownloadState`] is created when a fetch begins and dropped when it
//! resolves. It is owned by the fetch invocation and never shared.

use std::time::{Duration, Instant};

/// Lifecycle of a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    /// Waiting for a download slot.
    Pending,
    /// Request sent, waiting for response headers.
    Starting,
    /// Receiving the body.
    Downloading,
    /// Payload committed to its final path.
    Completed,
    /// Fetch failed.
    Failed,
    /// Fetch was cancelled.
    Cancelled,
}

impl DownloadStatus {
    /// Returns true once the fetch has resolved one way or another.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Progress bookkeeping for one fetch.
#[derive(Debug, Clone)]
pub struct DownloadState {
    /// Current status.
    pub status: DownloadStatus,
    /// Total size from `Content-Length`, if the server sent one.
    pub total_bytes: Option<u64>,
    /// Bytes written to the temp file so far.
    pub bytes_transferred: u64,
    /// Instantaneous speed in bytes per second.
    pub speed: f64,
    /// When the fetch began.
    pub started_at: Instant,
    /// Bytes and time at the last speed sample.
    sample_bytes: u64,
    sample_at: Instant,
}

/// Minimum window between speed samples.
const SPEED_SAMPLE_WINDOW: Duration = Duration::from_millis(250);

impl DownloadState {
    /// Create a pending state.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            status: DownloadStatus::Pending,
            total_bytes: None,
            bytes_transferred: 0,
            speed: 0.0,
            started_at: now,
            sample_bytes: 0,
            sample_at: now,
        }
    }

    /// Mark the request as sent.
    pub fn start(&mut self) {
        let now = Instant::now();
        self.status = DownloadStatus::Starting;
        self.started_at = now;
        self.sample_at = now;
    }

    /// Record the response headers.
    pub fn begin_body(&mut self, total_bytes: Option<u64>) {
        self.status = DownloadStatus::Downloading;
        self.total_bytes = total_bytes;
    }

    /// Record a chunk written to disk and refresh the speed sample.
    pub fn record_chunk(&mut self, bytes: usize) {
        self.record_chunk_at(bytes, Instant::now());
    }

    fn record_chunk_at(&mut self, bytes: usize, now: Instant) {
        self.bytes_transferred += bytes as u64;

        let window = now.saturating_duration_since(self.sample_at);
        if window >= SPEED_SAMPLE_WINDOW {
            let delta = self.bytes_transferred - self.sample_bytes;
            self.speed = delta as f64 / window.as_secs_f64();
            self.sample_bytes = self.bytes_transferred;
            self.sample_at = now;
        } else if self.speed == 0.0 {
            // No full window yet; fall back to the running average.
            let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64();
            if elapsed > 0.0 {
                self.speed = self.bytes_transferred as f64 / elapsed;
            }
        }
    }

    /// Mark the payload as committed.
    pub fn complete(&mut self) {
        self.status = DownloadStatus::Completed;
        // Unknown-length bodies are complete at whatever arrived.
        if self.total_bytes.is_none() {
            self.total_bytes = Some(self.bytes_transferred);
        }
    }

    /// Mark the fetch as failed.
    pub fn fail(&mut self) {
        self.status = DownloadStatus::Failed;
    }

    /// Mark the fetch as cancelled.
    pub fn cancel(&mut self) {
        self.status = DownloadStatus::Cancelled;
    }

    /// Progress as a percentage, if the total size is known.
    pub fn percent(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(100.0),
            Some(total) => Some((self.bytes_transferred as f64 / total as f64 * 100.0).min(100.0)),
            None => None,
        }
    }

    /// Time since the request was sent.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for DownloadState {
    fn default() -> Self {
        Self::new()
    }
}
