//! Serial and parallel dispatch of units to a worker function.

use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::EngineError;
use crate::source::Element;
use crate::summary::Processed;

/// How units are handed to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatcher {
    /// Every unit is processed on the calling thread.
    #[default]
    Serial,

    /// Units are processed by a pool of the given size.
    Parallel(NonZeroUsize),
}

impl Dispatcher {
    /// Serial for zero threads, parallel otherwise.
    pub fn for_threads(threads: usize) -> Self {
        match NonZeroUsize::new(threads) {
            Some(threads) => Self::Parallel(threads),
            None => Self::Serial,
        }
    }

    /// Number of units processed at once.
    pub fn parallelism(self) -> usize {
        match self {
            Self::Serial => 1,
            Self::Parallel(threads) => threads.get(),
        }
    }

    /// Runs `work` for every element until all are done or one asks to abort.
    ///
    /// Units already running when an abort is observed are completed; no new
    /// unit is submitted afterwards.
    pub fn dispatch<F>(self, elements: Vec<Element>, work: Arc<F>) -> Result<Vec<Processed>, EngineError>
    where
        F: Fn(Element) -> Processed + Send + Sync + 'static,
    {
        match self {
            Self::Serial => {
                let mut processed = Vec::with_capacity(elements.len());
                for element in elements {
                    let unit = panic::catch_unwind(AssertUnwindSafe(|| work(element)))
                        .map_err(|payload| {
                            let message = panic_message(payload.as_ref());
                            tracing::error!("Transformation worker failed: {}", message);
                            EngineError::WorkerPanicked(message)
                        })?;
                    let abort = unit.abort;
                    processed.push(unit);
                    if abort {
                        break;
                    }
                }
                Ok(processed)
            }
            Self::Parallel(threads) => Self::dispatch_parallel(threads.get(), elements, work),
        }
    }

    fn dispatch_parallel<F>(
        threads: usize,
        elements: Vec<Element>,
        work: Arc<F>,
    ) -> Result<Vec<Processed>, EngineError>
    where
        F: Fn(Element) -> Processed + Send + Sync + 'static,
    {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name("rivet-worker")
            .build()
            .map_err(EngineError::WorkerPool)?;

        let result = runtime.block_on(async move {
            let semaphore = Arc::new(Semaphore::new(threads));
            let aborted = Arc::new(AtomicBool::new(false));
            let mut tasks = JoinSet::new();

            for element in elements {
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                if aborted.load(Ordering::SeqCst) {
                    break;
                }

                let work = Arc::clone(&work);
                let aborted = Arc::clone(&aborted);
                tasks.spawn_blocking(move || {
                    let unit = work(element);
                    if unit.abort {
                        aborted.store(true, Ordering::SeqCst);
                    }
                    drop(permit);
                    unit
                });
            }

            let mut processed = Vec::new();
            let mut panicked = None;
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(unit) => processed.push(unit),
                    Err(e) => {
                        tracing::error!("Transformation worker failed: {}", e);
                        panicked.get_or_insert(e.to_string());
                    }
                }
            }

            match panicked {
                Some(message) => Err(EngineError::WorkerPanicked(message)),
                None => Ok(processed),
            }
        });

        runtime.shutdown_background();
        result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("task panicked with message {:?}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("task panicked with message {:?}", message)
    } else {
        "task panicked".to_string()
    }
}
