//! Ordered classpath location sets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// An ordered sequence of classpath locations (directories or archives).
///
/// Order decides lookup precedence, so two sets with the same locations in a
/// different order are different sets. Equality and hashing are by content,
/// which is what loading contexts are cached by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClasspathSet(Vec<PathBuf>);

impl ClasspathSet {
    /// Creates a set from locations, keeping their order.
    pub fn new<I, P>(locations: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self(locations.into_iter().map(Into::into).collect())
    }

    /// Creates a set with `first` in front of every location of `rest`.
    pub fn prefixed(first: impl Into<PathBuf>, rest: &ClasspathSet) -> Self {
        let mut locations = Vec::with_capacity(rest.len() + 1);
        locations.push(first.into());
        locations.extend(rest.0.iter().cloned());
        Self(locations)
    }

    /// Iterates over the locations in order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.0.iter().map(PathBuf::as_path)
    }

    /// Returns the number of locations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set has no locations.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolves every relative location against `base`.
    pub fn relative_to(&self, base: &Path) -> Self {
        Self(
            self.0
                .iter()
                .map(|location| {
                    if location.is_absolute() {
                        location.clone()
                    } else {
                        base.join(location)
                    }
                })
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a ClasspathSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
