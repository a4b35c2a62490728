//! Error types for Rivet.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Rivet core operations.
pub type Result<T> = std::result::Result<T, RivetError>;

/// Main error type for configuration and version handling.
#[derive(Debug, Error)]
pub enum RivetError {
    #[error("Build file not found in {0} or any parent directory")]
    ConfigNotFound(PathBuf),

    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse build file: {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid target version: '{0}'")]
    InvalidVersion(String),

    #[error("Unsupported class file version: {0}")]
    UnsupportedVersion(u16),
}

/// A resource that could not be released cleanly.
///
/// Release keeps going after a failure, so one error can carry several
/// failures from independent handles.
#[derive(Debug, Error)]
#[error("Failed to release {resource} ({} failure(s))", .failures.len())]
pub struct ReleaseError {
    /// What was being released.
    pub resource: String,

    /// Every individual failure, in release order.
    pub failures: Vec<ReleaseFailure>,
}

/// A single handle that failed to close.
#[derive(Debug, Error)]
#[error("Cannot close {location}")]
pub struct ReleaseFailure {
    pub location: String,
    #[source]
    pub source: std::io::Error,
}

impl ReleaseError {
    /// Creates an empty release error for the given resource.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            failures: Vec::new(),
        }
    }

    /// Records a failure.
    pub fn push(&mut self, location: impl Into<String>, source: std::io::Error) {
        self.failures.push(ReleaseFailure {
            location: location.into(),
            source,
        });
    }

    /// Absorbs the failures of a nested release.
    pub fn extend(&mut self, other: ReleaseError) {
        self.failures.extend(other.failures);
    }

    /// Returns `Ok` when nothing failed.
    pub fn into_result(self) -> std::result::Result<(), ReleaseError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}
