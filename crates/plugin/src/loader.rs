//! Loading contexts for plugin and entry point classpaths.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rivet_core::{ClasspathSet, Release, ReleaseError, TypeName};
use rivet_engine::ClassFileLocator;
use rivet_engine::locator::{Compound, FileSystem, Opener};

/// Finds types on one classpath.
///
/// A context owns the readers of its classpath until it is closed.
pub struct LoadingContext {
    classpath: ClasspathSet,
    locator: Compound,
    closed: AtomicBool,
}

impl LoadingContext {
    /// Opens readers for every location of `classpath`.
    pub fn open(classpath: ClasspathSet) -> Self {
        Self::open_with(&FileSystem, classpath)
    }

    /// Opens the readers of `classpath` through `opener`.
    pub fn open_with(opener: &dyn Opener, classpath: ClasspathSet) -> Self {
        let locator = opener.open(&classpath);
        Self {
            classpath,
            locator,
            closed: AtomicBool::new(false),
        }
    }

    pub fn classpath(&self) -> &ClasspathSet {
        &self.classpath
    }

    /// Returns true if the class file of `name` is on this classpath.
    ///
    /// Locations that cannot be read count as not containing the type.
    pub fn contains_type(&self, name: &TypeName) -> bool {
        match self.locator.locate(name) {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::debug!("Cannot look up {}: {}", name, e);
                false
            }
        }
    }

    /// Returns true once the context has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes every reader. Closing again has no effect.
    pub fn close(&self) -> Result<(), ReleaseError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.locator.close()
    }
}

impl std::fmt::Debug for LoadingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingContext")
            .field("classpath", &self.classpath)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Hands out one loading context per distinct classpath.
pub struct ClassLoaderResolver {
    opener: Arc<dyn Opener>,
    contexts: HashMap<ClasspathSet, Arc<LoadingContext>>,
}

impl ClassLoaderResolver {
    pub fn new() -> Self {
        Self::with_opener(Arc::new(FileSystem))
    }

    /// Creates a resolver opening classpaths through `opener`.
    pub fn with_opener(opener: Arc<dyn Opener>) -> Self {
        Self {
            opener,
            contexts: HashMap::new(),
        }
    }

    /// Returns the context for `classpath`, opening it on first request.
    pub fn resolve(&mut self, classpath: &ClasspathSet) -> Arc<LoadingContext> {
        let context = self
            .contexts
            .entry(classpath.clone())
            .or_insert_with(|| {
                Arc::new(LoadingContext::open_with(
                    self.opener.as_ref(),
                    classpath.clone(),
                ))
            });
        Arc::clone(context)
    }

    /// Number of contexts opened so far.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

impl Default for ClassLoaderResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClassLoaderResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassLoaderResolver")
            .field("contexts", &self.contexts.len())
            .finish()
    }
}

impl Release for ClassLoaderResolver {
    fn release(&mut self) -> Result<(), ReleaseError> {
        let mut error = ReleaseError::new("plugin class loaders");
        for (_, context) in self.contexts.drain() {
            if let Err(e) = context.close() {
                error.extend(e);
            }
        }
        error.into_result()
    }
}
