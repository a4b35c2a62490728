//! Engine error types.

use std::path::PathBuf;

use rivet_classfile::ClassFileError;
use rivet_core::{CodeVersion, TypeName};
use thiserror::Error;

/// Error raised by plugin and entry point code.
pub type PluginError = Box<dyn std::error::Error + Send + Sync>;

/// A failure of the engine itself, as opposed to a failed unit.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Cannot instantiate plugin {plugin}")]
    Instantiation {
        plugin: String,
        #[source]
        source: PluginError,
    },

    #[error("Cannot list class files in {root}")]
    Source {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot start worker pool")]
    WorkerPool(#[source] std::io::Error),

    #[error("Transformation worker failed: {0}")]
    WorkerPanicked(String),
}

/// Why a single unit could not be transformed.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("Cannot read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed class file {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: ClassFileError,
    },

    #[error("Entry point rejected the type")]
    EntryPoint(#[source] PluginError),

    #[error("Plugin {plugin} failed")]
    Plugin {
        plugin: String,
        #[source]
        source: PluginError,
    },

    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    #[error("Cannot write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A condition an error handler refuses to accept.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("Failed to resolve type description for {0}")]
    Unresolved(TypeName),

    #[error("Failed to instrument {target} since it has a live initializer defined by {defining}")]
    LiveInitializer { target: TypeName, defining: TypeName },

    #[error("Failing fast after {0} failed")]
    FailFast(TypeName),
}

/// A unit compiled for a newer platform than the build targets.
#[derive(Debug, Error)]
#[error("{name} has class file version {found}, newer than the target {target}")]
pub struct VersionTooNew {
    pub name: TypeName,
    pub found: u16,
    pub target: CodeVersion,
}

/// A rewrite the builder refused.
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("Decorating {0} cannot change its class file header")]
    HeaderChanged(TypeName),
}
