//! Strategy lookup by task kind.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::pipeline::InstallPipeline;
use super::variants::{
    ArchiveToolVariant, BrowserToolVariant, DriverUpdateVariant, GenericVariant, InstallVariant,
    UninstallUtilityVariant,
};
use super::InstallerStrategy;
use crate::catalog::{TaskDescriptor, TaskKind};
use crate::context::InstallContext;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no install variant registered for kind '{kind}' (product '{product}')")]
    UnknownKind { kind: TaskKind, product: String },
}

/// Maps each [`TaskKind`] to the variant that installs it.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    variants: HashMap<TaskKind, Arc<dyn InstallVariant>>,
}

impl StrategyRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in variant for every kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GenericVariant));
        registry.register(Arc::new(ArchiveToolVariant));
        registry.register(Arc::new(BrowserToolVariant));
        registry.register(Arc::new(DriverUpdateVariant));
        registry.register(Arc::new(UninstallUtilityVariant));
        registry
    }

    /// Register a variant under its own kind, replacing any previous one.
    pub fn register(&mut self, variant: Arc<dyn InstallVariant>) {
        self.variants.insert(variant.kind(), variant);
    }

    pub fn variant(&self, kind: TaskKind) -> Option<&Arc<dyn InstallVariant>> {
        self.variants.get(&kind)
    }

    /// Build the strategy for one product.
    pub fn build(
        &self,
        task: Arc<TaskDescriptor>,
        ctx: Arc<InstallContext>,
    ) -> Result<Arc<dyn InstallerStrategy>, RegistryError> {
        let variant = self
            .variant(task.kind)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownKind {
                kind: task.kind,
                product: task.name.clone(),
            })?;
        Ok(Arc::new(InstallPipeline::new(task, variant, ctx)))
    }

    /// Build strategies for a whole selection, preserving its order.
    pub fn build_all(
        &self,
        tasks: &[Arc<TaskDescriptor>],
        ctx: &Arc<InstallContext>,
    ) -> Result<Vec<Arc<dyn InstallerStrategy>>, RegistryError> {
        tasks
            .iter()
            .map(|t| self.build(Arc::clone(t), Arc::clone(ctx)))
            .collect()
    }
}
