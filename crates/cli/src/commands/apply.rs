//! Apply command implementation.

use miette::{Report, Result};
use rivet_core::BuildConfig;
use rivet_plugin::{BuildError, PluginRegistry, TransformAction};

use crate::output;

/// Transforms the class files of the configured build folder in place.
pub fn execute(config: &BuildConfig) -> Result<()> {
    let registry = PluginRegistry::builtin();

    let spinner = output::spinner(format!("Transforming {}", config.root.display()));
    let result = TransformAction::new(config, &registry).apply();
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            for error in &report.release_errors {
                output::warning(error);
            }
            let summary = &report.summary;
            output::status("Transformed", config.root.display());
            output::summary(summary.transformed.len(), summary.unchanged.len(), 0);
            Ok(())
        }
        Err(error) => {
            if let BuildError::UnitFailures {
                failed,
                transformed,
            } = &error
            {
                for (name, errors) in failed {
                    output::unit_failed(name, errors);
                }
                output::summary(transformed.len(), 0, failed.len());
            }
            Err(Report::new(error))
        }
    }
}
