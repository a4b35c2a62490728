//! The transformation run: resolve, configure, execute, report.

use std::sync::Arc;

use rivet_core::{BuildConfig, BuildLogger, Release, ReleaseError, Scoped};
use rivet_engine::locator::{Compound, FileSystem, Opener};
use rivet_engine::{
    Engine, EngineError, EntryPoint, FolderSource, FolderTarget, PluginFactory, Summary,
};

use crate::configurator::EngineConfigurator;
use crate::error::{BuildError, ResolutionError};
use crate::loader::ClassLoaderResolver;
use crate::logging::{TracingBuildLogger, TransformationLogger};
use crate::registry::PluginRegistry;
use crate::resolver::{EntryPointResolver, PluginResolver};

/// The outcome of a successful run.
#[derive(Debug)]
pub struct RunReport {
    pub summary: Summary,

    /// Resources that failed to close after the run. They do not fail the run.
    pub release_errors: Vec<ReleaseError>,
}

/// What a validation run resolved.
#[derive(Debug)]
pub struct Resolved {
    pub plugins: Vec<String>,
    pub entry_point: String,
    pub engine: String,

    /// Resources that failed to close after resolution.
    pub release_errors: Vec<ReleaseError>,
}

/// Transforms the class files of a build folder in place.
pub struct TransformAction<'a> {
    config: &'a BuildConfig,
    registry: &'a PluginRegistry,
    logger: Arc<dyn BuildLogger>,
    opener: Arc<dyn Opener>,
}

impl<'a> TransformAction<'a> {
    pub fn new(config: &'a BuildConfig, registry: &'a PluginRegistry) -> Self {
        Self {
            config,
            registry,
            logger: Arc::new(TracingBuildLogger::new()),
            opener: Arc::new(FileSystem),
        }
    }

    /// Sets the logger handed to plugins that ask for one.
    pub fn with_logger(mut self, logger: Arc<dyn BuildLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Sets how classpath locations are opened, for plugins and the build alike.
    pub fn with_opener(mut self, opener: Arc<dyn Opener>) -> Self {
        self.opener = opener;
        self
    }

    /// Runs every declared plugin over every class file below the root.
    ///
    /// Loading contexts and classpath readers are released on every path.
    /// Release failures are logged and reported, never turned into the outcome.
    pub fn apply(&self) -> Result<RunReport, BuildError> {
        self.check_root()?;

        let mut loaders = Scoped::new(
            "plugin class loaders",
            ClassLoaderResolver::with_opener(Arc::clone(&self.opener)),
        );
        let mut release_errors = Vec::new();

        let result = self.execute(&mut loaders, &mut release_errors);
        release_errors.extend(release(loaders));

        result.map(|summary| RunReport {
            summary,
            release_errors,
        })
    }

    /// Resolves plugins, entry point and engine without transforming anything.
    pub fn resolve_only(&self) -> Result<Resolved, BuildError> {
        self.check_root()?;

        let mut loaders = Scoped::new(
            "plugin class loaders",
            ClassLoaderResolver::with_opener(Arc::clone(&self.opener)),
        );
        let resolved = self.resolve(&mut loaders).and_then(|(factories, entry_point)| {
            let engine = EngineConfigurator::new(self.config).configure(
                Arc::clone(&entry_point),
                Arc::new(Compound::default()),
                Arc::new(TransformationLogger),
            )?;
            Ok(Resolved {
                plugins: factories
                    .iter()
                    .map(|factory| factory.declared_name().to_string())
                    .collect(),
                entry_point: format!("{:?}", entry_point),
                engine: describe(&engine),
                release_errors: Vec::new(),
            })
        });

        let release_error = release(loaders);
        resolved.map(|mut resolved| {
            resolved.release_errors.extend(release_error);
            resolved
        })
    }

    fn check_root(&self) -> Result<(), BuildError> {
        if self.config.root.is_dir() {
            Ok(())
        } else {
            Err(BuildError::InvalidRoot(self.config.root.clone()))
        }
    }

    fn resolve(
        &self,
        loaders: &mut ClassLoaderResolver,
    ) -> Result<(Vec<Arc<dyn PluginFactory>>, Arc<dyn EntryPoint>), BuildError> {
        let factories = PluginResolver::new(
            self.registry,
            &self.config.root,
            self.config.classpath.clone(),
            Arc::clone(&self.logger),
        )
        .resolve_all(loaders, &self.config.transformations)?;

        let entry_point = EntryPointResolver::new(self.registry, &self.config.root, &self.config.classpath)
            .resolve(loaders, &self.config.entry_point)?;

        Ok((factories, entry_point))
    }

    fn execute(
        &self,
        loaders: &mut ClassLoaderResolver,
        release_errors: &mut Vec<ReleaseError>,
    ) -> Result<Summary, BuildError> {
        let (factories, entry_point) = self.resolve(loaders)?;

        let locator = Scoped::new(
            "class file locator",
            self.opener.open(&self.config.classpath),
        );
        let summary = EngineConfigurator::new(self.config)
            .configure(
                entry_point,
                Arc::new(locator.clone()),
                Arc::new(TransformationLogger),
            )
            .and_then(|engine| {
                tracing::info!(
                    "Processing class files located in: {}",
                    self.config.root.display()
                );
                self.transform(&engine, &factories)
            });
        release_errors.extend(release(locator));

        self.interpret(summary?)
    }

    fn transform(
        &self,
        engine: &Engine,
        factories: &[Arc<dyn PluginFactory>],
    ) -> Result<Summary, BuildError> {
        let root = &self.config.root;
        engine
            .apply(&FolderSource::new(root), &FolderTarget::new(root), factories)
            .map_err(|error| match error {
                EngineError::Instantiation { plugin, source } => BuildError::PluginResolution {
                    plugin: plugin.clone(),
                    source: ResolutionError::Instantiation {
                        name: plugin,
                        source,
                    },
                },
                source => BuildError::TransformationExecution {
                    root: root.clone(),
                    source,
                },
            })
    }

    fn interpret(&self, summary: Summary) -> Result<Summary, BuildError> {
        if !summary.failed.is_empty() {
            return Err(BuildError::UnitFailures {
                failed: summary.failed,
                transformed: summary.transformed,
            });
        }

        if summary.transformed.is_empty() {
            if self.config.warn_on_empty_type_set {
                tracing::warn!("No types were transformed during plugin execution");
            }
        } else {
            tracing::info!("Transformed {} types", summary.transformed.len());
        }
        Ok(summary)
    }
}

/// Releases a scoped resource, logging what failed to close.
fn release<T: Release>(scope: Scoped<T>) -> Option<ReleaseError> {
    let error = scope.release().err()?;
    tracing::error!("{}", error);
    for failure in &error.failures {
        tracing::error!("{}: {}", failure, failure.source);
    }
    Some(error)
}

fn describe(engine: &Engine) -> String {
    format!(
        "{}, {:?} parsing, {:?} dispatch, {} error handlers",
        engine.version(),
        engine.pool_strategy(),
        engine.dispatcher(),
        engine.error_handlers().len()
    )
}
