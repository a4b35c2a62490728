//! The transformation engine.

use std::sync::Arc;

use rivet_core::{CodeVersion, TypeName};

use crate::dispatcher::Dispatcher;
use crate::entry_point::EntryPoint;
use crate::error::{EngineError, UnitError};
use crate::handler::ErrorHandler;
use crate::listener::{Listener, Silent};
use crate::locator::{ClassFileLocator, Compound, Folder};
use crate::plugin::{Plugin, PluginFactory};
use crate::pool::{PoolStrategy, TypePool};
use crate::source::{Element, FolderSource, FolderTarget};
use crate::summary::{Processed, Status, Summary};

/// Applies plugins to every unit of a source and stores the results.
pub struct Engine {
    entry_point: Arc<dyn EntryPoint>,
    version: CodeVersion,
    pool_strategy: PoolStrategy,
    locator: Arc<dyn ClassFileLocator>,
    listener: Arc<dyn Listener>,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
    dispatcher: Dispatcher,
}

impl Engine {
    /// Creates an engine with a fast pool, serial dispatch and no handlers.
    pub fn new(entry_point: Arc<dyn EntryPoint>, version: CodeVersion) -> Self {
        Self {
            entry_point,
            version,
            pool_strategy: PoolStrategy::default(),
            locator: Arc::new(Compound::default()),
            listener: Arc::new(Silent),
            error_handlers: Vec::new(),
            dispatcher: Dispatcher::default(),
        }
    }

    /// Sets how referenced types are resolved.
    pub fn with_pool_strategy(mut self, strategy: PoolStrategy) -> Self {
        self.pool_strategy = strategy;
        self
    }

    /// Sets where types outside the source are looked up.
    pub fn with_locator(mut self, locator: Arc<dyn ClassFileLocator>) -> Self {
        self.locator = locator;
        self
    }

    /// Sets the listener notified about the run.
    pub fn with_listener(mut self, listener: Arc<dyn Listener>) -> Self {
        self.listener = listener;
        self
    }

    /// Sets the error handler chain.
    pub fn with_error_handlers(mut self, handlers: Vec<Arc<dyn ErrorHandler>>) -> Self {
        self.error_handlers = handlers;
        self
    }

    /// Sets how units are dispatched.
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn version(&self) -> CodeVersion {
        self.version
    }

    pub fn pool_strategy(&self) -> PoolStrategy {
        self.pool_strategy
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher
    }

    pub fn entry_point(&self) -> &Arc<dyn EntryPoint> {
        &self.entry_point
    }

    pub fn error_handlers(&self) -> &[Arc<dyn ErrorHandler>] {
        &self.error_handlers
    }

    /// Transforms every unit of `source` and stores the results in `target`.
    ///
    /// One plugin instance is created per factory and closed after the last
    /// unit, whatever the outcome.
    pub fn apply(
        &self,
        source: &FolderSource,
        target: &FolderTarget,
        factories: &[Arc<dyn PluginFactory>],
    ) -> Result<Summary, EngineError> {
        let mut plugins = Vec::with_capacity(factories.len());
        for factory in factories {
            match factory.make() {
                Ok(plugin) => plugins.push(plugin),
                Err(source) => {
                    self.close(&plugins);
                    return Err(EngineError::Instantiation {
                        plugin: factory.declared_name().to_string(),
                        source,
                    });
                }
            }
        }

        let result = self.run(source, target, &plugins);
        self.close(&plugins);
        result
    }

    fn run(
        &self,
        source: &FolderSource,
        target: &FolderTarget,
        plugins: &[Arc<dyn Plugin>],
    ) -> Result<Summary, EngineError> {
        let elements = source.elements().map_err(|e| EngineError::Source {
            root: source.root().to_path_buf(),
            source: e,
        })?;
        tracing::debug!(
            "Dispatching {} units to {} workers",
            elements.len(),
            self.dispatcher.parallelism()
        );

        let root: Arc<dyn ClassFileLocator> = Arc::new(Folder::new(source.root()));
        let worker = Arc::new(Worker {
            entry_point: Arc::clone(&self.entry_point),
            version: self.version,
            pool_strategy: self.pool_strategy,
            locator: Compound::new(vec![root, Arc::clone(&self.locator)]),
            listener: Arc::clone(&self.listener),
            error_handlers: self.error_handlers.clone(),
            plugins: plugins.to_vec(),
            target: target.clone(),
        });

        let work = Arc::clone(&worker);
        let processed = self
            .dispatcher
            .dispatch(elements, Arc::new(move |element: Element| work.process(element)))?;

        let summary: Summary = processed.into_iter().collect();
        if !summary.failed.is_empty() {
            self.listener.on_errors(&summary.failed);
        }
        Ok(summary)
    }

    fn close(&self, plugins: &[Arc<dyn Plugin>]) {
        for plugin in plugins {
            if let Err(e) = plugin.close() {
                self.listener.on_close_error(plugin.as_ref(), &e);
            }
        }
    }
}

/// Processes single units on behalf of the engine.
struct Worker {
    entry_point: Arc<dyn EntryPoint>,
    version: CodeVersion,
    pool_strategy: PoolStrategy,
    locator: Compound,
    listener: Arc<dyn Listener>,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
    plugins: Vec<Arc<dyn Plugin>>,
    target: FolderTarget,
}

impl Worker {
    fn process(&self, element: Element) -> Processed {
        self.listener.on_discovery(&element.name);
        let processed = self.transform(&element);
        self.listener.on_complete(&element.name);
        processed
    }

    fn transform(&self, element: &Element) -> Processed {
        let bytes = match element.read() {
            Ok(bytes) => bytes,
            Err(source) => {
                let error = UnitError::Read {
                    path: element.path.clone(),
                    source,
                };
                return self.fail(&element.name, vec![error]);
            }
        };

        let pool = TypePool::new(&self.locator, self.pool_strategy);
        let description = match pool.describe_unit(&bytes) {
            Ok(description) => description,
            Err(source) => {
                let error = UnitError::Malformed {
                    path: element.path.clone(),
                    source,
                };
                return self.fail(&element.name, vec![error]);
            }
        };

        let mut builder = match self.entry_point.prepare(&description, bytes, self.version) {
            Ok(builder) => builder,
            Err(e) => return self.fail(&element.name, vec![UnitError::EntryPoint(e)]),
        };

        let mut errors = Vec::new();
        let mut applied = Vec::new();
        for plugin in &self.plugins {
            if !plugin.matches(&description) {
                continue;
            }
            match plugin.apply(&mut builder, &description, &pool) {
                Ok(()) => applied.push(Arc::clone(plugin)),
                Err(e) => {
                    self.listener.on_error(&description, plugin.as_ref(), &e);
                    for handler in &self.error_handlers {
                        if let Err(violation) = handler.on_error(&description, plugin.name(), &e) {
                            errors.push(violation.into());
                        }
                    }
                    errors.push(UnitError::Plugin {
                        plugin: plugin.name().to_string(),
                        source: e,
                    });
                }
            }
        }

        for unresolved in pool.unresolved() {
            self.listener.on_unresolved(&element.name, &unresolved);
            for handler in &self.error_handlers {
                if let Err(violation) = handler.on_unresolved(&element.name, &unresolved) {
                    errors.push(violation.into());
                }
            }
        }

        if !errors.is_empty() {
            return self.fail(&element.name, errors);
        }
        if applied.is_empty() {
            self.listener.on_ignored(&description);
            return Processed::new(element.name.clone(), Status::Unchanged);
        }

        let (bytes, live_initializers) = builder.finish();
        for defining in &live_initializers {
            self.listener.on_live_initializer(&element.name, defining);
            for handler in &self.error_handlers {
                if let Err(violation) = handler.on_live_initializer(&element.name, defining) {
                    errors.push(violation.into());
                }
            }
        }
        if !errors.is_empty() {
            return self.fail(&element.name, errors);
        }

        if let Err(source) = self.target.store(&element.relative, &bytes) {
            let error = UnitError::Write {
                path: self.target.root().join(&element.relative),
                source,
            };
            return self.fail(&element.name, vec![error]);
        }

        self.listener.on_transformation(&description, &applied);
        Processed::new(element.name.clone(), Status::Transformed)
    }

    fn fail(&self, name: &TypeName, errors: Vec<UnitError>) -> Processed {
        self.listener.on_unit_error(name, &errors);

        let mut abort = false;
        for handler in &self.error_handlers {
            if let Err(violation) = handler.on_unit_error(name, &errors) {
                tracing::debug!("{}", violation);
                abort = true;
            }
        }

        Processed {
            name: name.clone(),
            status: Status::Failed(errors),
            abort,
        }
    }
}
