//! Install pipeline errors.
//!
//! Every step of an install attempt returns one of these. The pipeline
//! converts the error that ended an attempt into a [`TaskResult`] with
//! [`InstallError::task_result`] and logs it in one place.

use std::path::PathBuf;

use thiserror::Error;

use crate::download::DownloadError;
use crate::orchestrator::TaskResult;

/// Payload rejected before execution.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("payload {} is not readable: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("payload is {actual} bytes, below the {minimum} byte minimum")]
    TooSmall { actual: u64, minimum: u64 },

    #[error("payload is {actual} bytes, expected {expected} within {tolerance_pct}%")]
    SizeMismatch {
        actual: u64,
        expected: u64,
        tolerance_pct: f64,
    },

    #[error("SHA-256 mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

/// Installer process failure.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code}")]
    ExitCode { program: String, code: i32 },

    #[error("{program} was terminated by a signal")]
    Terminated { program: String },

    #[error("{program} did not finish within {timeout_secs}s")]
    Timeout { program: String, timeout_secs: u64 },

    #[error("installer wait cancelled")]
    Cancelled,
}

/// Reason an install attempt ended without success.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("verification failed: {0}")]
    Verification(#[from] VerificationError),

    #[error("installer failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("installer reported success but the product was not detected")]
    DetectionAmbiguous,

    #[error("system requirements not met: {0}")]
    SystemRequirements(String),

    #[error("cancelled")]
    Cancelled,

    /// Post-install configuration failure; logged, never terminal.
    #[error("configuration failed: {0}")]
    Configuration(String),
}

impl InstallError {
    /// Terminal result recorded for an attempt that ended with this error.
    pub fn task_result(&self) -> TaskResult {
        match self {
            InstallError::Download(e) if e.is_cancelled() => TaskResult::Cancelled,
            InstallError::Download(_) => TaskResult::DownloadFailed,
            InstallError::Verification(_) => TaskResult::DownloadFailed,
            InstallError::Execution(ExecutionError::Cancelled) => TaskResult::Cancelled,
            InstallError::Execution(_) => TaskResult::InstallationFailed,
            InstallError::DetectionAmbiguous => TaskResult::InstallationFailed,
            InstallError::SystemRequirements(_) => TaskResult::SystemRequirementsNotMet,
            InstallError::Cancelled => TaskResult::Cancelled,
            InstallError::Configuration(_) => TaskResult::Error,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.task_result() == TaskResult::Cancelled
    }
}
