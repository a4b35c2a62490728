//! Validate command implementation.

use miette::{Report, Result};
use rivet_core::BuildConfig;
use rivet_plugin::{PluginRegistry, TransformAction};

use crate::output;

/// Resolves every declared plugin, the entry point and the engine.
pub fn execute(config: &BuildConfig) -> Result<()> {
    output::note("Checking", config.root.display());

    let registry = PluginRegistry::builtin();
    let resolved = match TransformAction::new(config, &registry).resolve_only() {
        Ok(resolved) => resolved,
        Err(e) => {
            output::error(&e);
            return Err(Report::new(e));
        }
    };

    output::heading("plugins");
    if resolved.plugins.is_empty() {
        output::item("(none)");
    }
    for plugin in &resolved.plugins {
        output::item(plugin);
    }

    output::heading("engine");
    output::field("entry_point", &resolved.entry_point);
    output::field("configuration", &resolved.engine);

    for error in &resolved.release_errors {
        output::warning(error);
    }

    println!();
    output::status(
        "Validated",
        format!("{} plugins resolved", resolved.plugins.len()),
    );
    Ok(())
}
