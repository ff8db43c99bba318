//! HTTP payload downloads.
//!
//! This module provides:
//! - Single streaming fetches with temp-file staging and atomic commit (`http`)
//! - Bounded batches of fetches with per-entry progress (`batch`)
//! - Per-fetch state tracking (`state`)
//! - Throttled progress reporting (`progress`)
//! - SHA-256 digests for payload verification (`checksum`)
//!
//! # Architecture
//!
//! ```text
//! InstallPipeline ──► Fetcher (trait) ──► HttpDownloader ──► reqwest
//!                                              │
//!                                              ├── global download slots (Semaphore)
//!                                              ├── DownloadState
//!                                              └── ProgressThrottle
//!
//! CLI fetch ──► BatchDownloader ──► Fetcher (up to M at once)
//! ```

mod batch;
mod checksum;
mod config;
mod error;
mod http;
mod progress;
mod state;
mod traits;

pub use batch::{BatchDownloader, BatchEntry, BatchResults};
pub use checksum::{digests_match, sha256_file, sha256_file_async};
pub use config::DownloadConfig;
pub use error::DownloadError;
pub use http::{HttpDownloader, TEMP_SUFFIX};
pub use progress::{
    BatchProgressCallback, FetchProgressCallback, ProgressThrottle, DEFAULT_PROGRESS_INTERVAL,
};
pub use state::{DownloadState, DownloadStatus};
pub use traits::Fetcher;
