//! Hooks invoked while a sequence executes.
//!
//! Visitors run in registration order at four points: once before any
//! statement runs, before and after each executed statement, and once after
//! the sequence stops. Only the final hook may modify the sequence.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::executable::ExecutableSequence;

pub trait ExecutionVisitor: Send {
    fn initialize(&mut self, _seq: &ExecutableSequence) {}

    fn visit_before_statement(&mut self, _seq: &ExecutableSequence, _index: usize) {}

    fn visit_after_statement(&mut self, _seq: &ExecutableSequence, _index: usize) {}

    fn visit_after_sequence(&mut self, _seq: &mut ExecutableSequence) {}
}

/// External source of "which types did execution pass through".
pub trait CoverageCollector: Send {
    /// Types exercised since the previous call; resets the collector.
    fn check_and_reset(&mut self) -> BTreeSet<String>;
}

#[derive(Debug, Default)]
struct CoverageState {
    epoch: u64,
    covered: BTreeSet<String>,
}

/// Thread-safe coverage sink an executor can record into while a
/// [`CoverageVisitor`] drains it.
///
/// Every drain starts a new epoch. Executors that may outlive their
/// sequence (isolated workers) should record through a [`CoverageScope`]
/// taken when the statement starts, so late records are dropped instead of
/// leaking into the next sequence.
#[derive(Debug, Clone, Default)]
pub struct SharedCoverage(Arc<Mutex<CoverageState>>);

impl SharedCoverage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, type_name: &str) {
        let mut state = self.0.lock();
        if !state.covered.contains(type_name) {
            state.covered.insert(type_name.to_string());
        }
    }

    /// Pin records to the current epoch.
    pub fn scope(&self) -> CoverageScope {
        CoverageScope {
            shared: self.clone(),
            epoch: self.0.lock().epoch,
        }
    }
}

impl CoverageCollector for SharedCoverage {
    fn check_and_reset(&mut self) -> BTreeSet<String> {
        let mut state = self.0.lock();
        state.epoch += 1;
        std::mem::take(&mut state.covered)
    }
}

/// Records into a [`SharedCoverage`] only while its epoch is current.
#[derive(Debug, Clone)]
pub struct CoverageScope {
    shared: SharedCoverage,
    epoch: u64,
}

impl CoverageScope {
    /// Returns false if the record arrived after its sequence was drained.
    pub fn record(&self, type_name: &str) -> bool {
        let mut state = self.shared.0.lock();
        if state.epoch != self.epoch {
            return false;
        }
        if !state.covered.contains(type_name) {
            state.covered.insert(type_name.to_string());
        }
        true
    }
}

/// Attaches the exercised types reported by a [`CoverageCollector`] to each
/// sequence. With a designated set, only those types are recorded.
pub struct CoverageVisitor<C: CoverageCollector> {
    collector: C,
    designated: Option<BTreeSet<String>>,
}

impl<C: CoverageCollector> CoverageVisitor<C> {
    pub fn new(collector: C) -> Self {
        Self {
            collector,
            designated: None,
        }
    }

    pub fn designated(collector: C, types: impl IntoIterator<Item = String>) -> Self {
        Self {
            collector,
            designated: Some(types.into_iter().collect()),
        }
    }
}

impl<C: CoverageCollector> ExecutionVisitor for CoverageVisitor<C> {
    fn initialize(&mut self, _seq: &ExecutableSequence) {
        // drop anything recorded outside this sequence
        self.collector.check_and_reset();
    }

    fn visit_after_sequence(&mut self, seq: &mut ExecutableSequence) {
        for name in self.collector.check_and_reset() {
            let wanted = self
                .designated
                .as_ref()
                .map_or(true, |set| set.contains(&name));
            if wanted {
                seq.add_covered_type(name);
            }
        }
    }
}

/// Emits a `trace!` event at every hook.
#[derive(Debug, Default)]
pub struct TraceVisitor;

impl ExecutionVisitor for TraceVisitor {
    fn initialize(&mut self, seq: &ExecutableSequence) {
        trace!(statements = seq.len(), "sequence execution starting");
    }

    fn visit_before_statement(&mut self, seq: &ExecutableSequence, index: usize) {
        if let Some(stmt) = seq.sequence().statement(index) {
            trace!(index, operation = %stmt.operation(), "before statement");
        }
    }

    fn visit_after_statement(&mut self, seq: &ExecutableSequence, index: usize) {
        trace!(index, outcome = ?seq.outcome(index), "after statement");
    }

    fn visit_after_sequence(&mut self, seq: &mut ExecutableSequence) {
        trace!(normal = seq.is_normal_execution(), "sequence execution finished");
    }
}
