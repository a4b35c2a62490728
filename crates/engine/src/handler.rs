//! Error handlers decide which conditions fail a unit or the whole run.

use std::fmt;

use rivet_core::TypeName;

use crate::error::{PluginError, PolicyViolation, UnitError};
use crate::pool::TypeDescription;

/// Decides whether a condition observed during a unit's transformation is
/// acceptable.
///
/// Every handler of the chain sees every condition; any violation fails the
/// unit. Violations from [`ErrorHandler::on_unit_error`] also stop the engine
/// from submitting further units.
pub trait ErrorHandler: Send + Sync + fmt::Debug {
    /// A plugin failed to transform `target`.
    fn on_error(
        &self,
        _target: &TypeDescription,
        _plugin: &str,
        _error: &PluginError,
    ) -> Result<(), PolicyViolation> {
        Ok(())
    }

    /// `target` failed with the given causes.
    fn on_unit_error(&self, _target: &TypeName, _errors: &[UnitError]) -> Result<(), PolicyViolation> {
        Ok(())
    }

    /// Transforming `target` registered a live initializer of `defining`.
    fn on_live_initializer(
        &self,
        _target: &TypeName,
        _defining: &TypeName,
    ) -> Result<(), PolicyViolation> {
        Ok(())
    }

    /// `type_name` could not be resolved while transforming `target`.
    fn on_unresolved(&self, _target: &TypeName, _type_name: &TypeName) -> Result<(), PolicyViolation> {
        Ok(())
    }
}

/// Refuses conditions that would make the output unreliable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforcing {
    /// Every type looked up while transforming a unit must resolve.
    AllTypesResolved,

    /// Transformed units must not register live initializers.
    NoLiveInitializers,
}

impl ErrorHandler for Enforcing {
    fn on_unresolved(&self, _target: &TypeName, type_name: &TypeName) -> Result<(), PolicyViolation> {
        match self {
            Self::AllTypesResolved => Err(PolicyViolation::Unresolved(type_name.clone())),
            Self::NoLiveInitializers => Ok(()),
        }
    }

    fn on_live_initializer(
        &self,
        target: &TypeName,
        defining: &TypeName,
    ) -> Result<(), PolicyViolation> {
        match self {
            Self::AllTypesResolved => Ok(()),
            Self::NoLiveInitializers => Err(PolicyViolation::LiveInitializer {
                target: target.clone(),
                defining: defining.clone(),
            }),
        }
    }
}

/// Stops the run after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failing {
    /// No unit is submitted after the first failed one.
    FailFast,
}

impl ErrorHandler for Failing {
    fn on_unit_error(&self, target: &TypeName, _errors: &[UnitError]) -> Result<(), PolicyViolation> {
        match self {
            Self::FailFast => Err(PolicyViolation::FailFast(target.clone())),
        }
    }
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOp;

impl ErrorHandler for NoOp {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enforcing_unresolved() {
        let target = TypeName::new("a.B");
        let missing = TypeName::new("a.Missing");

        assert_eq!(
            Enforcing::AllTypesResolved.on_unresolved(&target, &missing),
            Err(PolicyViolation::Unresolved(missing.clone()))
        );
        assert!(
            Enforcing::NoLiveInitializers
                .on_unresolved(&target, &missing)
                .is_ok()
        );
    }

    #[test]
    fn test_enforcing_live_initializers() {
        let target = TypeName::new("a.B");
        let defining = TypeName::new("a.Init");

        assert!(
            Enforcing::NoLiveInitializers
                .on_live_initializer(&target, &defining)
                .is_err()
        );
        assert!(
            Enforcing::AllTypesResolved
                .on_live_initializer(&target, &defining)
                .is_ok()
        );
        assert!(NoOp.on_live_initializer(&target, &defining).is_ok());
    }

    #[test]
    fn test_fail_fast() {
        let target = TypeName::new("a.B");
        assert_eq!(
            Failing::FailFast.on_unit_error(&target, &[]),
            Err(PolicyViolation::FailFast(target.clone()))
        );
        assert!(NoOp.on_unit_error(&target, &[]).is_ok());
    }
}
