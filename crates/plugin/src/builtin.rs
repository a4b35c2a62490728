//! Plugins shipped with the tool.

use std::sync::Arc;

use rivet_engine::{Plugin, PluginError, TypeDescription, TypePool, UnitBuilder};

use crate::registry::{Constructor, PluginDescriptor, PluginRegistry};

/// Name of the plugin that matches nothing.
pub const NO_OP: &str = "rivet.plugin.NoOp";

/// A plugin that never matches, useful to check a build's wiring.
#[derive(Debug, Default)]
pub struct NoOpPlugin;

impl Plugin for NoOpPlugin {
    fn name(&self) -> &str {
        NO_OP
    }

    fn matches(&self, _target: &TypeDescription) -> bool {
        false
    }

    fn apply(
        &self,
        _builder: &mut UnitBuilder,
        _target: &TypeDescription,
        _pool: &TypePool<'_>,
    ) -> Result<(), PluginError> {
        Ok(())
    }
}

pub(crate) fn register(registry: PluginRegistry) -> PluginRegistry {
    registry.with_plugin(
        PluginDescriptor::bundled(NO_OP)
            .with_constructor(Constructor::new(Vec::new(), |_| Ok(Arc::new(NoOpPlugin)))),
    )
}
