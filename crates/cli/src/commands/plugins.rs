//! Plugins command implementation.

use miette::Result;
use rivet_engine::DefaultEntryPoint;
use rivet_plugin::PluginRegistry;

use crate::output;

/// Lists the bundled plugins and entry points.
pub fn execute() -> Result<()> {
    let registry = PluginRegistry::builtin();

    output::heading("plugins");
    for plugin in registry.plugins() {
        output::item(plugin.name());
    }

    output::heading("entry points");
    for entry_point in DefaultEntryPoint::ALL {
        output::item(entry_point.name());
    }
    for entry_point in registry.entry_points() {
        output::item(entry_point.name());
    }

    Ok(())
}
