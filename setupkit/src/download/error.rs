//! Error types for payload downloads.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching a payload.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Transport-level failure (DNS, connect, TLS, body read).
    #[error("failed to download {url}: {reason}")]
    Http { url: String, reason: String },

    /// The server answered with a non-success status code.
    #[error("GET {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// The request did not complete within the client timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Failed to write the payload to disk.
    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// Failed to create the destination directory.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    /// The destination file name is empty or contains path separators.
    #[error("invalid destination file name: {0:?}")]
    InvalidFileName(String),

    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The fetch was cancelled before it completed.
    #[error("download cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Returns true if the fetch stopped because cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                timeout_secs,
            }
        } else {
            Self::Http {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = DownloadError::Status {
            url: "https://example.com/setup.exe".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "GET https://example.com/setup.exe failed with status 404"
        );
    }

    #[test]
    fn test_is_cancelled() {
        assert!(DownloadError::Cancelled.is_cancelled());
        assert!(!DownloadError::InvalidFileName(String::new()).is_cancelled());
    }
}
