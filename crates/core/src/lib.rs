//! Rivet Core - Core types and configuration for the Rivet class file transformer.

mod classpath;
mod config;
mod error;
mod logger;
mod scope;
mod type_name;
mod version;

pub use classpath::ClasspathSet;
pub use config::{
    BUILD_FILE_NAME, BuildConfig, DEFAULT_ENTRY_POINT, EntryPointSpec, PluginArgument,
    TransformationSpec,
};
pub use error::{ReleaseError, ReleaseFailure, Result, RivetError};
pub use logger::BuildLogger;
pub use scope::{Release, Scoped};
pub use type_name::TypeName;
pub use version::CodeVersion;
