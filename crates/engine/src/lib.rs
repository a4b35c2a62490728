//! Rivet Engine - Applies plugins to the class files of a build.

mod dispatcher;
mod engine;
mod entry_point;
mod error;
mod handler;
mod listener;
pub mod locator;
mod plugin;
mod pool;
mod source;
mod summary;

pub use dispatcher::Dispatcher;
pub use engine::Engine;
pub use entry_point::{DefaultEntryPoint, EntryPoint};
pub use error::{BuilderError, EngineError, PluginError, PolicyViolation, UnitError, VersionTooNew};
pub use handler::{Enforcing, ErrorHandler, Failing, NoOp};
pub use listener::{Listener, Silent};
pub use locator::ClassFileLocator;
pub use plugin::{Plugin, PluginFactory, Simple, UnitBuilder};
pub use pool::{PoolStrategy, TypeDescription, TypePool};
pub use source::{Element, FolderSource, FolderTarget};
pub use summary::{Processed, Status, Summary};
