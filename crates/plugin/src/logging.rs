//! Adapters from the engine's callbacks to `tracing`.

use std::collections::BTreeMap;
use std::sync::Arc;

use rivet_core::{BuildLogger, TypeName};
use rivet_engine::{Listener, Plugin, PluginError, TypeDescription, UnitError};

/// A build logger writing through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingBuildLogger;

impl TracingBuildLogger {
    pub fn new() -> Self {
        Self
    }
}

impl BuildLogger for TracingBuildLogger {
    fn is_debug_enabled(&self) -> bool {
        tracing::enabled!(tracing::Level::DEBUG)
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Reports engine progress in the build log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformationLogger;

impl Listener for TransformationLogger {
    fn on_transformation(&self, target: &TypeDescription, plugins: &[Arc<dyn Plugin>]) {
        let names: Vec<&str> = plugins.iter().map(|plugin| plugin.name()).collect();
        tracing::debug!("Transformed {} using [{}]", target, names.join(", "));
    }

    fn on_error(&self, target: &TypeDescription, plugin: &dyn Plugin, error: &PluginError) {
        tracing::warn!("Failed to transform {} using {}: {}", target, plugin.name(), error);
    }

    fn on_errors(&self, failed: &BTreeMap<TypeName, Vec<UnitError>>) {
        tracing::warn!("Failed to transform {} types", failed.len());
    }

    fn on_close_error(&self, plugin: &dyn Plugin, error: &PluginError) {
        tracing::error!("Failed to close {}: {}", plugin.name(), error);
    }

    fn on_live_initializer(&self, target: &TypeName, defining: &TypeName) {
        tracing::debug!(
            "Discovered live initializer for {} as a result of transforming {}",
            defining,
            target
        );
    }
}
