//! A sequence paired with its execution results and checks.

use std::collections::BTreeSet;

use tracing::{trace, warn};

use seqgen_types::Value;

use super::outcome::Outcome;
use super::runner::StatementRunner;
use super::visitor::ExecutionVisitor;
use crate::classify::checks::TestChecks;
use crate::sequence::Sequence;

static NOT_EXECUTED: Outcome = Outcome::NotExecuted;

/// A [`Sequence`] together with one [`Outcome`] per statement.
///
/// Results are truncated at the first statement that does not complete
/// normally; every later statement stays [`Outcome::NotExecuted`].
#[derive(Debug, Clone)]
pub struct ExecutableSequence {
    sequence: Sequence,
    results: Vec<Outcome>,
    checks: TestChecks,
    covered_types: BTreeSet<String>,
}

impl ExecutableSequence {
    pub fn new(sequence: Sequence) -> Self {
        let results = vec![Outcome::NotExecuted; sequence.len()];
        Self {
            sequence,
            results,
            checks: TestChecks::default(),
            covered_types: BTreeSet::new(),
        }
    }

    /// Start from outcomes already observed for a prefix of `sequence`, so
    /// that [`execute`](Self::execute) only runs the remaining statements.
    pub fn with_prefix(sequence: Sequence, prefix: Vec<Outcome>) -> Self {
        let mut exec = Self::new(sequence);
        for (slot, outcome) in exec.results.iter_mut().zip(prefix) {
            *slot = outcome;
        }
        exec
    }

    /// Run every statement that has not been executed yet, stopping at the
    /// first non-normal outcome.
    pub fn execute(&mut self, runner: &StatementRunner, visitors: &mut [Box<dyn ExecutionVisitor>]) {
        for visitor in visitors.iter_mut() {
            visitor.initialize(self);
        }

        let start = self
            .results
            .iter()
            .position(|r| !r.is_normal())
            .unwrap_or(self.results.len());

        for index in start..self.sequence.len() {
            if self.results[index].is_executed() {
                // a prefix statement already failed
                break;
            }
            let Some(stmt) = self.sequence.statement(index) else {
                break;
            };
            let args: Option<Vec<Value>> = stmt
                .inputs()
                .iter()
                .map(|&i| self.results[i].value().cloned())
                .collect();
            let Some(args) = args else {
                warn!(index, "statement input was never produced; leaving it unexecuted");
                break;
            };

            for visitor in visitors.iter_mut() {
                visitor.visit_before_statement(self, index);
            }
            let operation = stmt.operation().clone();
            let outcome = runner.run(&operation, args);
            trace!(index, operation = %operation, normal = outcome.is_normal(), "statement finished");
            let normal = outcome.is_normal();
            self.results[index] = outcome;
            for visitor in visitors.iter_mut() {
                visitor.visit_after_statement(self, index);
            }
            if !normal {
                break;
            }
        }

        for visitor in visitors.iter_mut() {
            visitor.visit_after_sequence(self);
        }
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Used to adjust active flags before the sequence is shared.
    pub fn sequence_mut(&mut self) -> &mut Sequence {
        &mut self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn results(&self) -> &[Outcome] {
        &self.results
    }

    pub fn outcome(&self, index: usize) -> Option<&Outcome> {
        self.results.get(index)
    }

    /// Value produced by statement `index`, if it completed normally.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.results.get(index).and_then(Outcome::value)
    }

    /// Runtime arguments statement `index` was (or would be) called with.
    pub fn input_values(&self, index: usize) -> Vec<Option<&Value>> {
        self.sequence
            .statement(index)
            .map(|s| s.inputs().iter().map(|&i| self.value(i)).collect())
            .unwrap_or_default()
    }

    /// Outcome of the last statement.
    pub fn final_outcome(&self) -> &Outcome {
        self.results.last().unwrap_or(&NOT_EXECUTED)
    }

    pub fn is_normal_execution(&self) -> bool {
        self.results.iter().all(Outcome::is_normal)
    }

    /// Index of the first executed statement that did not complete normally.
    pub fn fault_index(&self) -> Option<usize> {
        self.results
            .iter()
            .position(|r| r.is_executed() && !r.is_normal())
    }

    pub fn has_non_executed_statements(&self) -> bool {
        self.results.iter().any(|r| !r.is_executed())
    }

    pub fn checks(&self) -> &TestChecks {
        &self.checks
    }

    pub fn set_checks(&mut self, checks: TestChecks) {
        self.checks = checks;
    }

    pub fn add_covered_type(&mut self, name: impl Into<String>) {
        self.covered_types.insert(name.into());
    }

    pub fn covers_type(&self, name: &str) -> bool {
        self.covered_types.contains(name)
    }

    pub fn covered_types(&self) -> &BTreeSet<String> {
        &self.covered_types
    }
}
