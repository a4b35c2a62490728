//! Resolution of declared plugins and entry points.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rivet_core::{BuildLogger, ClasspathSet, EntryPointSpec, TransformationSpec, TypeName};
use rivet_engine::{DefaultEntryPoint, EntryPoint, PluginFactory};

use crate::error::{BuildError, ResolutionError};
use crate::factory::{ArgumentResolver, RegisteredFactory};
use crate::loader::{ClassLoaderResolver, LoadingContext};
use crate::registry::{ArgumentValue, PluginRegistry};

/// Checks that a registered type is visible from a loading context.
///
/// Bundled types are always visible; others must be on the context's classpath.
fn is_visible(bundled: bool, name: &TypeName, context: &LoadingContext) -> bool {
    bundled || context.contains_type(name)
}

/// Turns declared transformations into plugin factories.
pub struct PluginResolver<'a> {
    registry: &'a PluginRegistry,
    root: PathBuf,
    classpath: ClasspathSet,
    logger: Arc<dyn BuildLogger>,
}

impl<'a> PluginResolver<'a> {
    /// Creates a resolver binding `root` and `logger` as implicit arguments.
    pub fn new(
        registry: &'a PluginRegistry,
        root: impl Into<PathBuf>,
        classpath: ClasspathSet,
        logger: Arc<dyn BuildLogger>,
    ) -> Self {
        Self {
            registry,
            root: root.into(),
            classpath,
            logger,
        }
    }

    /// Resolves every transformation in declaration order.
    ///
    /// Stops at the first transformation that cannot be resolved.
    pub fn resolve_all(
        &self,
        loaders: &mut ClassLoaderResolver,
        transformations: &[TransformationSpec],
    ) -> Result<Vec<Arc<dyn PluginFactory>>, BuildError> {
        let mut factories: Vec<Arc<dyn PluginFactory>> = Vec::with_capacity(transformations.len());
        for transformation in transformations {
            let factory = self.resolve(loaders, transformation).map_err(|source| {
                BuildError::PluginResolution {
                    plugin: transformation.raw_plugin().to_string(),
                    source,
                }
            })?;
            tracing::info!("Resolved plugin: {}", transformation.raw_plugin());
            factories.push(Arc::new(factory));
        }
        Ok(factories)
    }

    /// Resolves a single transformation.
    pub fn resolve(
        &self,
        loaders: &mut ClassLoaderResolver,
        transformation: &TransformationSpec,
    ) -> Result<RegisteredFactory, ResolutionError> {
        let name = transformation.plugin_name();
        let context = loaders.resolve(&transformation.classpath_set(&self.root, &self.classpath));

        let descriptor = match self.registry.plugin(&name) {
            Some(descriptor) if is_visible(descriptor.is_bundled(), &name, &context) => descriptor,
            _ if context.contains_type(&name) => return Err(ResolutionError::NotAPlugin(name)),
            _ => return Err(ResolutionError::ClassNotFound(name)),
        };

        let mut resolvers: Vec<ArgumentResolver> = transformation
            .arguments
            .iter()
            .map(|argument| ArgumentResolver::ForIndex {
                index: argument.index,
                value: argument.value.clone(),
            })
            .collect();
        resolvers.push(ArgumentResolver::ForType(ArgumentValue::Path(self.root.clone())));
        resolvers.push(ArgumentResolver::ForType(ArgumentValue::Logger(Arc::clone(
            &self.logger,
        ))));

        RegisteredFactory::new(transformation.raw_plugin(), descriptor, &resolvers, context)
    }
}

/// Turns the declared entry point into an instance.
pub struct EntryPointResolver<'a> {
    registry: &'a PluginRegistry,
    root: &'a Path,
    classpath: &'a ClasspathSet,
}

impl<'a> EntryPointResolver<'a> {
    pub fn new(registry: &'a PluginRegistry, root: &'a Path, classpath: &'a ClasspathSet) -> Self {
        Self {
            registry,
            root,
            classpath,
        }
    }

    /// Resolves a built-in strategy by name, or a registered entry point type.
    pub fn resolve(
        &self,
        loaders: &mut ClassLoaderResolver,
        spec: &EntryPointSpec,
    ) -> Result<Arc<dyn EntryPoint>, BuildError> {
        let entry_point = self.lookup(loaders, spec).map_err(|source| BuildError::PluginResolution {
            plugin: spec.name.clone(),
            source,
        })?;
        tracing::info!("Resolved entry point: {:?}", entry_point);
        Ok(entry_point)
    }

    fn lookup(
        &self,
        loaders: &mut ClassLoaderResolver,
        spec: &EntryPointSpec,
    ) -> Result<Arc<dyn EntryPoint>, ResolutionError> {
        if let Some(builtin) = DefaultEntryPoint::from_name(&spec.name) {
            return Ok(Arc::new(builtin));
        }

        let name = TypeName::new(&spec.name);
        let context = loaders.resolve(&spec.classpath_set(self.root, self.classpath));
        let descriptor = match self.registry.entry_point(&name) {
            Some(descriptor) if is_visible(descriptor.is_bundled(), &name, &context) => descriptor,
            _ if context.contains_type(&name) => return Err(ResolutionError::NotAnEntryPoint(name)),
            _ => return Err(ResolutionError::ClassNotFound(name)),
        };

        descriptor
            .construct()
            .map_err(|source| ResolutionError::Instantiation {
                name: spec.name.clone(),
                source,
            })
    }
}
