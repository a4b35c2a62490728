//! Observers of an engine run.

use std::collections::BTreeMap;
use std::sync::Arc;

use rivet_core::TypeName;

use crate::error::{PluginError, UnitError};
use crate::plugin::Plugin;
use crate::pool::TypeDescription;

/// Receives notifications about a run. Listeners cannot influence the outcome.
pub trait Listener: Send + Sync {
    /// A unit was found and is about to be processed.
    fn on_discovery(&self, _name: &TypeName) {}

    /// `target` was transformed by `plugins`.
    fn on_transformation(&self, _target: &TypeDescription, _plugins: &[Arc<dyn Plugin>]) {}

    /// No plugin matched `target`.
    fn on_ignored(&self, _target: &TypeDescription) {}

    /// `plugin` failed to transform `target`.
    fn on_error(&self, _target: &TypeDescription, _plugin: &dyn Plugin, _error: &PluginError) {}

    /// `name` failed with the given causes.
    fn on_unit_error(&self, _name: &TypeName, _errors: &[UnitError]) {}

    /// The run finished with failed units.
    fn on_errors(&self, _failed: &BTreeMap<TypeName, Vec<UnitError>>) {}

    /// `plugin` failed to close.
    fn on_close_error(&self, _plugin: &dyn Plugin, _error: &PluginError) {}

    /// Transforming `target` registered a live initializer of `defining`.
    fn on_live_initializer(&self, _target: &TypeName, _defining: &TypeName) {}

    /// `type_name` could not be resolved while transforming `target`.
    fn on_unresolved(&self, _target: &TypeName, _type_name: &TypeName) {}

    /// Processing of `name` finished.
    fn on_complete(&self, _name: &TypeName) {}
}

/// A listener ignoring every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Listener for Silent {}
