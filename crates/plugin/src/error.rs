//! Resolution and build error types.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use miette::Diagnostic;
use rivet_core::{RivetError, TypeName};
use rivet_engine::{EngineError, PluginError, UnitError};
use thiserror::Error;

use crate::registry::ParameterType;

/// Why a declared plugin or entry point could not be resolved.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Type {0} cannot be found on the plugin classpath")]
    ClassNotFound(TypeName),

    #[error("{0} does not implement the plugin contract")]
    NotAPlugin(TypeName),

    #[error("{0} does not implement the entry point contract")]
    NotAnEntryPoint(TypeName),

    #[error("No constructor of {0} can be satisfied by the declared arguments")]
    NoResolvableConstructor(TypeName),

    #[error("{name} has {count} equally suitable constructors")]
    AmbiguousConstructors { name: TypeName, count: usize },

    #[error("Argument {index} of {name} is not a valid {expected}: '{value}'")]
    InvalidArgument {
        name: TypeName,
        index: usize,
        value: String,
        expected: ParameterType,
    },

    #[error("Cannot instantiate {name}")]
    Instantiation {
        name: String,
        #[source]
        source: PluginError,
    },
}

/// The terminal outcome of a failed transformation run.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("Target location does not exist or is not a folder: {0}")]
    #[diagnostic(
        code(rivet::invalid_root),
        help("Point `root` at the folder holding the compiled classes")
    )]
    InvalidRoot(PathBuf),

    #[error("Cannot resolve plugin: {plugin}")]
    #[diagnostic(code(rivet::plugin_resolution))]
    PluginResolution {
        plugin: String,
        #[source]
        source: ResolutionError,
    },

    #[error("Cannot create plugin engine")]
    #[diagnostic(code(rivet::engine_construction))]
    EngineConstruction {
        #[source]
        source: RivetError,
    },

    #[error("Failed to transform class files in {root}")]
    #[diagnostic(code(rivet::transformation))]
    TransformationExecution {
        root: PathBuf,
        #[source]
        source: EngineError,
    },

    #[error("{} type transformations have failed: [{}]", .failed.len(), list(.failed))]
    #[diagnostic(code(rivet::unit_failures))]
    UnitFailures {
        failed: BTreeMap<TypeName, Vec<UnitError>>,

        /// Units that were transformed and stored before the run failed.
        transformed: BTreeSet<TypeName>,
    },
}

fn list(failed: &BTreeMap<TypeName, Vec<UnitError>>) -> String {
    failed
        .keys()
        .map(TypeName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl BuildError {
    /// Names of the failed units, for reporting.
    pub fn failed_types(&self) -> Vec<&TypeName> {
        match self {
            Self::UnitFailures { failed, .. } => failed.keys().collect(),
            _ => Vec::new(),
        }
    }
}
