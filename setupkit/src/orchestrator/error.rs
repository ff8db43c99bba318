//! Orchestrator errors.

use thiserror::Error;

/// Reasons a session refuses to start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("an installation session is already running")]
    AlreadyRunning,

    #[error("no products selected")]
    EmptySelection,

    #[error("product '{0}' is selected more than once")]
    DuplicateTask(String),
}
