//! Entry points prepare each unit before plugins run.

use std::fmt;
use std::str::FromStr;

use rivet_core::CodeVersion;

use crate::error::{PluginError, VersionTooNew};
use crate::plugin::UnitBuilder;
use crate::pool::TypeDescription;

/// Prepares the builder every plugin of a unit works on.
pub trait EntryPoint: Send + Sync + fmt::Debug {
    /// Creates the builder for `target` from its current bytes.
    fn prepare(
        &self,
        target: &TypeDescription,
        bytes: Vec<u8>,
        version: CodeVersion,
    ) -> Result<UnitBuilder, PluginError>;
}

/// The built-in entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultEntryPoint {
    /// Plugins may rewrite the unit freely.
    Rebase,

    /// Plugins may redefine the unit.
    Redefine,

    /// Plugins may redefine the unit without touching its hierarchy.
    RedefineLocal,

    /// Plugins may only decorate the unit; its header stays as compiled.
    Decorate,
}

impl DefaultEntryPoint {
    /// Every built-in entry point.
    pub const ALL: [Self; 4] = [
        Self::Rebase,
        Self::Redefine,
        Self::RedefineLocal,
        Self::Decorate,
    ];

    /// The declared name of this entry point.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rebase => "REBASE",
            Self::Redefine => "REDEFINE",
            Self::RedefineLocal => "REDEFINE_LOCAL",
            Self::Decorate => "DECORATE",
        }
    }

    /// Looks up a built-in entry point, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|entry_point| entry_point.name().eq_ignore_ascii_case(name))
    }
}

impl FromStr for DefaultEntryPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("Unknown entry point: {}", s))
    }
}

impl fmt::Display for DefaultEntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl EntryPoint for DefaultEntryPoint {
    fn prepare(
        &self,
        target: &TypeDescription,
        bytes: Vec<u8>,
        version: CodeVersion,
    ) -> Result<UnitBuilder, PluginError> {
        if let Some(found) = target.major_version()
            && found > version.major()
        {
            return Err(Box::new(VersionTooNew {
                name: target.name().clone(),
                found,
                target: version,
            }));
        }

        let builder = UnitBuilder::new(target.name().clone(), bytes);
        Ok(match self {
            Self::Rebase | Self::Redefine | Self::RedefineLocal => builder,
            Self::Decorate => builder.decorating(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_classfile::{ClassHeader, write_class};

    fn unit(java: u16) -> (TypeDescription, Vec<u8>) {
        let header = ClassHeader::new("app.Service", CodeVersion::of_java_version(java).unwrap());
        let bytes = write_class(&header);
        (TypeDescription::of(header), bytes)
    }

    #[test]
    fn test_from_name_ignores_case() {
        assert_eq!(
            DefaultEntryPoint::from_name("redefine_local"),
            Some(DefaultEntryPoint::RedefineLocal)
        );
        assert_eq!(
            "Decorate".parse::<DefaultEntryPoint>(),
            Ok(DefaultEntryPoint::Decorate)
        );
        assert_eq!(DefaultEntryPoint::from_name("com.example.Custom"), None);
    }

    #[test]
    fn test_rejects_newer_units() {
        let (target, bytes) = unit(21);
        let version = CodeVersion::of_java_version(17).unwrap();

        let err = DefaultEntryPoint::Rebase
            .prepare(&target, bytes, version)
            .unwrap_err();
        assert!(err.to_string().contains("newer than the target"));
    }

    #[test]
    fn test_decorate_locks_header() {
        let (target, bytes) = unit(11);
        let version = CodeVersion::of_java_version(17).unwrap();

        let rebase = DefaultEntryPoint::Rebase
            .prepare(&target, bytes.clone(), version)
            .unwrap();
        assert!(!rebase.is_decorating());

        let decorate = DefaultEntryPoint::Decorate
            .prepare(&target, bytes, version)
            .unwrap();
        assert!(decorate.is_decorating());
    }
}
