//! Logging handle handed to plugins.

use std::fmt;

/// A logger plugins can request as a constructor argument.
///
/// The orchestrator binds an implementation backed by the build's own
/// logging, so plugins never pick a sink themselves.
pub trait BuildLogger: Send + Sync + fmt::Debug {
    /// Returns true if debug messages are recorded.
    fn is_debug_enabled(&self) -> bool;

    fn debug(&self, message: &str);

    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);
}
