//! Orchestrator configuration.

use std::time::Duration;

use super::policy::RetryPolicy;

/// Default number of installs running at once.
pub const DEFAULT_MAX_CONCURRENT_INSTALLATIONS: usize = 3;

/// Session-wide limits.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Group size: installs running at once.
    pub max_concurrent_installations: usize,
    /// Retry behaviour for failed attempts.
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_installations: DEFAULT_MAX_CONCURRENT_INSTALLATIONS,
            retry: RetryPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the group size (minimum 1).
    pub fn with_max_concurrent_installations(mut self, max: usize) -> Self {
        self.max_concurrent_installations = max.max(1);
        self
    }

    /// Fixed-delay retries: `max_retries` extra attempts, `delay` apart.
    pub fn with_retries(mut self, max_retries: u32, delay: Duration) -> Self {
        self.retry = if max_retries == 0 {
            RetryPolicy::None
        } else {
            RetryPolicy::fixed(max_retries, delay)
        };
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Retries after the initial attempt.
    pub fn max_retry_count(&self) -> u32 {
        self.retry.max_retries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_concurrent_installations, 3);
        assert_eq!(config.max_retry_count(), 2);
        assert_eq!(config.retry.delay_for_retry(1), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_builders() {
        let config = OrchestratorConfig::new()
            .with_max_concurrent_installations(0)
            .with_retries(0, Duration::from_secs(5));
        assert_eq!(config.max_concurrent_installations, 1);
        assert_eq!(config.retry, RetryPolicy::None);

        let config = config.with_retries(1, Duration::from_millis(10));
        assert_eq!(config.max_retry_count(), 1);
    }
}
