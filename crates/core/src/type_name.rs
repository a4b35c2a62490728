//! Type names in binary, internal and resource form.

use std::fmt;

use serde::{Deserialize, Serialize};

const CLASS_FILE_EXTENSION: &str = ".class";

/// The binary name of a type, e.g. `com.example.Foo`.
///
/// Internal names (`com/example/Foo`) are accepted on construction and
/// normalized, so both spellings compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Creates a type name from a binary or internal name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().replace('/', "."))
    }

    /// Derives a type name from a class file path relative to a classpath root.
    ///
    /// Returns `None` for anything that is not a class file.
    pub fn from_resource_path(path: &str) -> Option<Self> {
        let path = path.replace('\\', "/");
        let stem = path.strip_suffix(CLASS_FILE_EXTENSION)?;
        let stem = stem.trim_start_matches('/');
        if stem.is_empty() || stem.ends_with('/') {
            return None;
        }
        Some(Self::new(stem))
    }

    /// Returns the binary name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the internal name, e.g. `com/example/Foo`.
    pub fn internal_name(&self) -> String {
        self.0.replace('.', "/")
    }

    /// Returns the class file path, e.g. `com/example/Foo.class`.
    pub fn resource_path(&self) -> String {
        format!("{}{}", self.internal_name(), CLASS_FILE_EXTENSION)
    }

    /// Returns the package part, empty for the default package.
    pub fn package(&self) -> &str {
        self.0.rsplit_once('.').map(|(package, _)| package).unwrap_or("")
    }

    /// Returns the name without its package.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit_once('.').map(|(_, name)| name).unwrap_or(&self.0)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
