//! Rivet Plugin - Plugin resolution and orchestration of transformation runs.
//!
//! This crate turns a [`rivet_core::BuildConfig`] into a transformation run:
//! declared plugins and the entry point are looked up in a
//! [`PluginRegistry`], their classpaths are opened through a
//! [`ClassLoaderResolver`], the engine is configured and executed over the
//! build folder, and the summary becomes the run's outcome.

mod action;
mod builtin;
mod configurator;
mod error;
mod factory;
mod loader;
mod logging;
mod registry;
mod resolver;

pub use action::{Resolved, RunReport, TransformAction};
pub use builtin::{NO_OP, NoOpPlugin};
pub use configurator::EngineConfigurator;
pub use error::{BuildError, ResolutionError};
pub use factory::{ArgumentResolver, RegisteredFactory};
pub use loader::{ClassLoaderResolver, LoadingContext};
pub use logging::{TracingBuildLogger, TransformationLogger};
pub use registry::{
    ArgumentValue, Arguments, Constructor, EntryPointDescriptor, ParameterType, PluginDescriptor,
    PluginRegistry,
};
pub use resolver::{EntryPointResolver, PluginResolver};
