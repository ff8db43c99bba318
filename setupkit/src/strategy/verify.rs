//! Payload checks run between download and execution.

use std::path::Path;

use tracing::debug;

use super::error::VerificationError;
use crate::catalog::TaskDescriptor;
use crate::download::{digests_match, sha256_file_async};

/// Smallest payload accepted by default (1 KiB).
pub const DEFAULT_MIN_PAYLOAD_BYTES: u64 = 1024;

/// Default relative tolerance against a declared size (10%).
pub const DEFAULT_SIZE_TOLERANCE: f64 = 0.1;

/// Rejects payloads that are truncated, the wrong size, or the wrong bytes.
///
/// Checks run in order: size (declared size within tolerance, else the
/// minimum), then declared SHA-256.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadVerifier {
    min_size: u64,
    size_tolerance: f64,
}

impl Default for PayloadVerifier {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_PAYLOAD_BYTES,
            size_tolerance: DEFAULT_SIZE_TOLERANCE,
        }
    }
}

impl PayloadVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_size(mut self, bytes: u64) -> Self {
        self.min_size = bytes;
        self
    }

    /// Relative tolerance, clamped to `0.0..=1.0`.
    pub fn with_size_tolerance(mut self, tolerance: f64) -> Self {
        self.size_tolerance = if tolerance.is_finite() {
            tolerance.clamp(0.0, 1.0)
        } else {
            DEFAULT_SIZE_TOLERANCE
        };
        self
    }

    pub fn min_size(&self) -> u64 {
        self.min_size
    }

    pub fn size_tolerance(&self) -> f64 {
        self.size_tolerance
    }

    /// Check a payload against the descriptor's expectations.
    ///
    /// Returns the payload size on success.
    pub async fn verify(
        &self,
        path: &Path,
        task: &TaskDescriptor,
    ) -> Result<u64, VerificationError> {
        let actual = tokio::fs::metadata(path)
            .await
            .map_err(|source| VerificationError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        self.check_size(actual, task.expected_size)?;

        if let Some(expected) = &task.sha256 {
            let digest = sha256_file_async(path.to_path_buf()).await.map_err(|source| {
                VerificationError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            if !digests_match(expected, &digest) {
                return Err(VerificationError::HashMismatch {
                    expected: expected.trim().to_ascii_lowercase(),
                    actual: digest,
                });
            }
        }

        debug!(product = %task.name, bytes = actual, "payload verified");
        Ok(actual)
    }

    /// Size-only part of [`verify`](Self::verify).
    ///
    /// A declared size is checked against the tolerance window alone; the
    /// minimum applies to payloads without one. Empty payloads always fail.
    pub fn check_size(&self, actual: u64, expected: Option<u64>) -> Result<(), VerificationError> {
        let Some(expected) = expected else {
            if actual < self.min_size.max(1) {
                return Err(VerificationError::TooSmall {
                    actual,
                    minimum: self.min_size.max(1),
                });
            }
            return Ok(());
        };

        if actual == 0 {
            return Err(VerificationError::TooSmall { actual, minimum: 1 });
        }

        let allowed = expected as f64 * self.size_tolerance;
        let diff = (actual as f64 - expected as f64).abs();
        if diff > allowed {
            return Err(VerificationError::SizeMismatch {
                actual,
                expected,
                tolerance_pct: (self.size_tolerance * 100.0).round(),
            });
        }

        Ok(())
    }
}
