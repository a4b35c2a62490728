//! Class file versions.

use std::fmt;

use crate::error::{Result, RivetError};

/// Offset between a Java language version and its class file major version.
const MAJOR_OFFSET: u16 = 44;

/// The newest Java version this build understands.
const LATEST_JAVA_VERSION: u16 = 25;

/// A class file major version, e.g. 61 for Java 17.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeVersion {
    major: u16,
}

impl CodeVersion {
    /// Creates a version from a class file major version.
    pub fn of_major(major: u16) -> Result<Self> {
        if major <= MAJOR_OFFSET || major > LATEST_JAVA_VERSION + MAJOR_OFFSET {
            return Err(RivetError::UnsupportedVersion(major));
        }
        Ok(Self { major })
    }

    /// Creates a version from a Java language version, e.g. `8` or `17`.
    pub fn of_java_version(version: u16) -> Result<Self> {
        Self::of_major(version.saturating_add(MAJOR_OFFSET))
    }

    /// Parses a declared Java version such as `"17"`, `"1.8"` or `"VERSION_11"`.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let digits = trimmed.strip_prefix("VERSION_").unwrap_or(trimmed);
        let digits = digits.replace('_', ".");
        let version = match digits.strip_prefix("1.") {
            Some(legacy) => legacy,
            None => digits.as_str(),
        };

        let version: u16 = version
            .parse()
            .map_err(|_| RivetError::InvalidVersion(text.to_string()))?;

        Self::of_java_version(version).map_err(|_| RivetError::InvalidVersion(text.to_string()))
    }

    /// The newest version supported by this build of the tool.
    ///
    /// Used when the build does not declare a target, which makes the
    /// output depend on the tool release that ran it.
    pub fn latest() -> Self {
        Self {
            major: LATEST_JAVA_VERSION + MAJOR_OFFSET,
        }
    }

    /// Returns the class file major version.
    pub fn major(self) -> u16 {
        self.major
    }

    /// Returns the Java language version.
    pub fn java_version(self) -> u16 {
        self.major - MAJOR_OFFSET
    }
}

impl fmt::Display for CodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Java {} ({})", self.java_version(), self.major)
    }
}
