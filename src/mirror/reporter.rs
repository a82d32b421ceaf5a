//! Progress and warning reporting
//!
//! The fetcher and the Writer report through a [`Reporter`] handed to them
//! by the orchestrator. [`TracingReporter`] turns reports into `tracing`
//! events.

use std::sync::Mutex;

use fnv::FnvHashMap;
use tracing::{debug, info, warn};

use super::Phase;
use crate::error::UnexpectedBindingShape;

pub trait Reporter: Send + Sync {
    /// The orchestrator entered a phase
    fn phase(&self, _phase: Phase) {}

    /// `done` of `total` identifiers of `label` have been fetched
    fn progress(&self, label: &str, done: usize, total: usize);

    /// A result row was skipped
    fn warning(&self, warning: &UnexpectedBindingShape);

    /// The Writer committed a batch
    fn committed(&self, _batch_len: usize, _inserted: usize, _total_inserted: usize) {}
}

/// Integer completion percentage, 100 for an empty total
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (done.min(total) * 100 / total) as u8
}

/// Reporter that logs through `tracing`
///
/// Progress is logged only when the integer percentage of a label changes.
#[derive(Debug, Default)]
pub struct TracingReporter {
    last: Mutex<FnvHashMap<String, u8>>,
}

impl TracingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `pct` for `label`, returning whether it changed
    fn advance(&self, label: &str, pct: u8) -> bool {
        let Ok(mut last) = self.last.lock() else {
            return true;
        };
        if last.get(label) == Some(&pct) {
            return false;
        }
        last.insert(label.to_string(), pct);
        true
    }
}

impl Reporter for TracingReporter {
    fn phase(&self, phase: Phase) {
        info!(%phase, "entering phase");
    }

    fn progress(&self, label: &str, done: usize, total: usize) {
        let pct = percent(done, total);
        if self.advance(label, pct) {
            info!(target: "kgmirror::progress", "{}: {}% ({}/{})", label, pct, done, total);
        }
    }

    fn warning(&self, warning: &UnexpectedBindingShape) {
        warn!(query = %warning.query, variable = %warning.variable, "skipping binding: {}", warning);
    }

    fn committed(&self, batch_len: usize, inserted: usize, total_inserted: usize) {
        debug!(batch_len, inserted, total_inserted, "batch committed");
    }
}
