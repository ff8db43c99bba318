//! SetupKit - unattended installation of a curated software catalog.
//!
//! This library turns a selection of catalog entries into a scheduled,
//! concurrency-bounded, retryable sequence of install pipelines:
//!
//! ```text
//! Catalog ──► InstallOrchestrator ──► group 1 ─┬─► InstallerStrategy ──► download → verify → execute → configure → detect
//!                  (priority sort,             ├─► InstallerStrategy ──► ...
//!                   groups of N,               └─► ...
//!                   retry, cancel)   group 2 ──► ...
//! ```
//!
//! # Modules
//!
//! - [`catalog`]: product descriptors and catalog loading
//! - [`download`]: streaming HTTP fetches with atomic commit and bounded batches
//! - [`strategy`]: the per-product install pipeline and its variants
//! - [`probe`]: detection, offline fallback payloads, host facts, settings sinks
//! - [`orchestrator`]: session scheduling, retry, progress and summary
//! - [`context`]: the collaborator bundle shared by all strategies
//! - [`config`]: `config.ini` handling
//! - [`logging`]: tracing subscriber setup

use std::future::Future;
use std::pin::Pin;

pub mod catalog;
pub mod config;
pub mod context;
pub mod download;
pub mod logging;
pub mod orchestrator;
pub mod probe;
pub mod strategy;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use catalog::{Catalog, Category, TaskDescriptor, TaskKind};
pub use context::InstallContext;
pub use orchestrator::{InstallOrchestrator, OrchestratorConfig, SessionSummary, TaskResult};
