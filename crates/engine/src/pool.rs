//! Type descriptions resolved through a class file locator.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use rivet_classfile::{ClassFileError, ClassHeader, read_header};
use rivet_core::TypeName;

use crate::locator::ClassFileLocator;

/// How eagerly referenced types are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolStrategy {
    /// Describe referenced types only when asked for them.
    #[default]
    Fast,

    /// Resolve a type's whole super type hierarchy as soon as it is described.
    Extended,
}

/// Describes a type: its name and, unless it belongs to the platform, its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescription {
    name: TypeName,
    header: Option<ClassHeader>,
}

impl TypeDescription {
    /// Describes a type from its class file header.
    pub fn of(header: ClassHeader) -> Self {
        Self {
            name: header.this_class.clone(),
            header: Some(header),
        }
    }

    /// Describes a platform type without reading it.
    pub fn platform(name: TypeName) -> Self {
        Self { name, header: None }
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    /// The class file header, absent for platform types.
    pub fn header(&self) -> Option<&ClassHeader> {
        self.header.as_ref()
    }

    pub fn super_class(&self) -> Option<&TypeName> {
        self.header.as_ref().and_then(|h| h.super_class.as_ref())
    }

    pub fn interfaces(&self) -> &[TypeName] {
        self.header
            .as_ref()
            .map(|h| h.interfaces.as_slice())
            .unwrap_or_default()
    }

    pub fn is_interface(&self) -> bool {
        self.header.as_ref().is_some_and(|h| h.access.is_interface())
    }

    /// Class file major version, absent for platform types.
    pub fn major_version(&self) -> Option<u16> {
        self.header.as_ref().map(|h| h.major)
    }

    /// Returns true for types provided by the platform rather than a classpath.
    pub fn is_platform(&self) -> bool {
        self.header.is_none()
    }
}

impl fmt::Display for TypeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Returns true for types the running platform provides.
fn is_platform_type(name: &TypeName) -> bool {
    name.as_str().starts_with("java.")
}

/// Describes types for a single unit's transformation.
///
/// A pool records every type it failed to resolve so the engine can hand them
/// to the error handlers once the unit is done.
pub struct TypePool<'a> {
    locator: &'a dyn ClassFileLocator,
    strategy: PoolStrategy,
    cache: RefCell<HashMap<TypeName, Option<TypeDescription>>>,
    unresolved: RefCell<BTreeSet<TypeName>>,
}

impl<'a> TypePool<'a> {
    /// Creates a pool backed by the given locator.
    pub fn new(locator: &'a dyn ClassFileLocator, strategy: PoolStrategy) -> Self {
        Self {
            locator,
            strategy,
            cache: RefCell::new(HashMap::new()),
            unresolved: RefCell::new(BTreeSet::new()),
        }
    }

    /// Returns the resolution strategy.
    pub fn strategy(&self) -> PoolStrategy {
        self.strategy
    }

    /// Returns the locator types are read from.
    pub fn locator(&self) -> &'a dyn ClassFileLocator {
        self.locator
    }

    /// Describes the unit being transformed from its own bytes.
    pub fn describe_unit(&self, bytes: &[u8]) -> Result<TypeDescription, ClassFileError> {
        let description = TypeDescription::of(read_header(bytes)?);
        self.cache
            .borrow_mut()
            .insert(description.name.clone(), Some(description.clone()));

        if self.strategy == PoolStrategy::Extended {
            self.hierarchy(&description);
        }
        Ok(description)
    }

    /// Describes a type by name, or `None` if it cannot be resolved.
    pub fn describe(&self, name: &TypeName) -> Option<TypeDescription> {
        let description = self.resolve(name)?;
        if self.strategy == PoolStrategy::Extended {
            self.hierarchy(&description);
        }
        Some(description)
    }

    /// Resolves every super type of `description`, nearest first.
    ///
    /// Types that cannot be resolved are skipped and recorded.
    pub fn hierarchy(&self, description: &TypeDescription) -> Vec<TypeDescription> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<TypeName> = description
            .super_class()
            .into_iter()
            .chain(description.interfaces())
            .cloned()
            .collect();
        let mut hierarchy = Vec::new();

        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(super_type) = self.resolve(&name) {
                queue.extend(super_type.super_class().cloned());
                queue.extend(super_type.interfaces().iter().cloned());
                hierarchy.push(super_type);
            }
        }

        hierarchy
    }

    /// Returns true if `description` is `ancestor` or inherits from it.
    pub fn is_assignable_to(&self, description: &TypeDescription, ancestor: &TypeName) -> bool {
        description.name() == ancestor
            || self
                .hierarchy(description)
                .iter()
                .any(|super_type| super_type.name() == ancestor)
    }

    /// Returns the types this pool could not resolve so far.
    pub fn unresolved(&self) -> Vec<TypeName> {
        self.unresolved.borrow().iter().cloned().collect()
    }

    fn resolve(&self, name: &TypeName) -> Option<TypeDescription> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return cached.clone();
        }

        let resolved = if is_platform_type(name) {
            Some(TypeDescription::platform(name.clone()))
        } else {
            self.read(name)
        };

        if resolved.is_none() {
            self.unresolved.borrow_mut().insert(name.clone());
        }
        self.cache
            .borrow_mut()
            .insert(name.clone(), resolved.clone());
        resolved
    }

    fn read(&self, name: &TypeName) -> Option<TypeDescription> {
        let bytes = match self.locator.locate(name) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("Cannot read class file of {}: {}", name, e);
                return None;
            }
        };

        match read_header(&bytes) {
            Ok(header) => Some(TypeDescription::of(header)),
            Err(e) => {
                tracing::debug!("Cannot parse class file of {}: {}", name, e);
                None
            }
        }
    }
}
