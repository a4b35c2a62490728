//! Derives the engine configuration of a run from the build configuration.

use std::sync::Arc;

use rivet_core::{BuildConfig, CodeVersion, RivetError};
use rivet_engine::{
    ClassFileLocator, Dispatcher, Enforcing, Engine, EntryPoint, ErrorHandler, Failing, Listener,
    NoOp, PoolStrategy,
};

use crate::error::BuildError;

/// Builds the engine for one run.
#[derive(Debug)]
pub struct EngineConfigurator<'a> {
    config: &'a BuildConfig,
}

impl<'a> EngineConfigurator<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self { config }
    }

    /// The declared target version, or the newest supported one.
    pub fn target_version(&self) -> Result<CodeVersion, RivetError> {
        match &self.config.target_version {
            Some(declared) => {
                let version = CodeVersion::parse(declared)?;
                tracing::debug!("Java version detected: {}", version);
                Ok(version)
            }
            None => {
                let version = CodeVersion::latest();
                tracing::warn!(
                    "Could not locate target version, build is platform dependent: {}",
                    version.major()
                );
                Ok(version)
            }
        }
    }

    pub fn pool_strategy(&self) -> PoolStrategy {
        if self.config.extended_parsing {
            PoolStrategy::Extended
        } else {
            PoolStrategy::Fast
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::for_threads(self.config.threads)
    }

    /// The error handler chain: unresolved types always fail a unit, live
    /// initializers and fail-fast depend on the configuration.
    pub fn error_handlers(&self) -> Vec<Arc<dyn ErrorHandler>> {
        let live_initializers: Arc<dyn ErrorHandler> = if self.config.fail_on_live_initializer {
            Arc::new(Enforcing::NoLiveInitializers)
        } else {
            Arc::new(NoOp)
        };
        let fail_fast: Arc<dyn ErrorHandler> = if self.config.fail_fast {
            Arc::new(Failing::FailFast)
        } else {
            Arc::new(NoOp)
        };

        vec![
            Arc::new(Enforcing::AllTypesResolved),
            live_initializers,
            fail_fast,
        ]
    }

    /// Creates the engine.
    pub fn configure(
        &self,
        entry_point: Arc<dyn EntryPoint>,
        locator: Arc<dyn ClassFileLocator>,
        listener: Arc<dyn Listener>,
    ) -> Result<Engine, BuildError> {
        let version = self
            .target_version()
            .map_err(|source| BuildError::EngineConstruction { source })?;

        Ok(Engine::new(entry_point, version)
            .with_pool_strategy(self.pool_strategy())
            .with_locator(locator)
            .with_listener(listener)
            .with_error_handlers(self.error_handlers())
            .with_dispatcher(self.dispatcher()))
    }
}
