//! Outcome of an engine run.

use std::collections::{BTreeMap, BTreeSet};

use rivet_core::TypeName;

use crate::error::UnitError;

/// What happened to a single unit.
#[derive(Debug)]
pub enum Status {
    /// At least one plugin rewrote the unit and it was stored.
    Transformed,

    /// No plugin matched the unit.
    Unchanged,

    /// The unit could not be transformed.
    Failed(Vec<UnitError>),
}

/// A processed unit as reported by a worker.
#[derive(Debug)]
pub struct Processed {
    pub name: TypeName,
    pub status: Status,

    /// Set when an error handler asked to stop submitting units.
    pub abort: bool,
}

impl Processed {
    pub fn new(name: TypeName, status: Status) -> Self {
        Self {
            name,
            status,
            abort: false,
        }
    }
}

/// Transformed, unchanged and failed units of one run.
#[derive(Debug, Default)]
pub struct Summary {
    pub transformed: BTreeSet<TypeName>,
    pub unchanged: BTreeSet<TypeName>,
    pub failed: BTreeMap<TypeName, Vec<UnitError>>,
}

impl Summary {
    /// Records a processed unit.
    pub fn record(&mut self, processed: Processed) {
        match processed.status {
            Status::Transformed => {
                self.transformed.insert(processed.name);
            }
            Status::Unchanged => {
                self.unchanged.insert(processed.name);
            }
            Status::Failed(errors) => {
                self.failed.entry(processed.name).or_default().extend(errors);
            }
        }
    }

    /// Returns true if no unit failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of units the run looked at.
    pub fn len(&self) -> usize {
        self.transformed.len() + self.unchanged.len() + self.failed.len()
    }

    /// Returns true if the run saw no unit.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Processed> for Summary {
    fn from_iter<I: IntoIterator<Item = Processed>>(iter: I) -> Self {
        let mut summary = Self::default();
        for processed in iter {
            summary.record(processed);
        }
        summary
    }
}
