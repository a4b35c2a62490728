//! Scoped release of resources acquired during a run.

use std::ops::{Deref, DerefMut};

use crate::error::ReleaseError;

/// A resource holding handles that must be closed.
pub trait Release {
    /// Closes every handle, continuing past individual failures.
    ///
    /// Releasing an already released resource must succeed without effect.
    fn release(&mut self) -> Result<(), ReleaseError>;
}

/// Owns a resource and releases it exactly once.
///
/// Calling [`Scoped::release`] returns the release outcome to the caller.
/// Any other way out of the scope (an early `?`, a panic unwinding) releases
/// from `Drop` and logs failures, since there is no caller left to take them.
pub struct Scoped<T: Release> {
    name: &'static str,
    resource: T,
    released: bool,
}

impl<T: Release> Scoped<T> {
    /// Takes ownership of a resource.
    pub fn new(name: &'static str, resource: T) -> Self {
        Self {
            name,
            resource,
            released: false,
        }
    }

    /// Releases the resource and reports the outcome.
    pub fn release(mut self) -> Result<(), ReleaseError> {
        self.released = true;
        self.resource.release()
    }
}

impl<T: Release> Deref for Scoped<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.resource
    }
}

impl<T: Release> DerefMut for Scoped<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.resource
    }
}

impl<T: Release> Drop for Scoped<T> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(error) = self.resource.release() {
            tracing::error!(resource = self.name, "{error}");
            for failure in &error.failures {
                tracing::error!(resource = self.name, "{failure}: {}", failure.source);
            }
        }
    }
}
