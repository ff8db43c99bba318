//! Configuration for the payload downloader.

use std::time::Duration;

use super::progress::DEFAULT_PROGRESS_INTERVAL;

/// Default timeout for a single fetch (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default number of simultaneous fetches across the whole process.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;

/// Configuration for [`HttpDownloader`](super::HttpDownloader).
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Timeout for a whole request, body included.
    pub timeout: Duration,

    /// Timeout for establishing the connection.
    pub connect_timeout: Duration,

    /// Global limit on simultaneous fetches.
    ///
    /// Independent of how many installs run at once.
    pub max_concurrent_downloads: usize,

    /// Minimum interval between progress reports.
    pub progress_interval: Duration,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            user_agent: format!("setupkit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl DownloadConfig {
    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the global concurrent download limit (minimum 1).
    pub fn with_max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max.max(1);
        self
    }

    /// Set the minimum interval between progress reports.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}
