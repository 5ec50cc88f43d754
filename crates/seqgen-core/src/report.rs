//! Report types for generation runs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::TestChecks;
use crate::execution::ExecutableSequence;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TimeLimit,
    InputLimit,
    OutputLimit,
    ErrorTestFound,
    /// The caller's stop predicate fired.
    Stopper,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::TimeLimit => "time limit reached",
            StopReason::InputLimit => "input limit reached",
            StopReason::OutputLimit => "output limit reached",
            StopReason::ErrorTestFound => "error-revealing test found",
            StopReason::Stopper => "stopped by caller",
        })
    }
}

/// Running counters of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorStats {
    /// Candidate attempts, including ones abandoned before execution.
    pub attempts: u64,
    /// Candidates handed to the executor.
    pub executed: u64,
    /// Attempts abandoned because an input had no candidate.
    pub input_failures: u64,
    /// Candidates skipped as identical to an earlier candidate.
    pub duplicates_skipped: u64,
    /// Candidates discarded for exceeding the maximum length.
    pub too_long: u64,
    pub regression_classified: u64,
    pub error_classified: u64,
    pub discarded_invalid: u64,
    pub discarded_nonterminating: u64,
    pub discarded_not_executed: u64,
    /// Classified tests dropped by the output switches or predicates.
    pub filtered_out: u64,
    pub regression_emitted: u64,
    pub error_emitted: u64,
    /// Sequences added to the component pool.
    pub pool_additions: u64,
    /// Sequences kept out of the pool by the duplicate policy.
    pub pool_duplicates: u64,
    /// Runtime values promoted to literal sequences.
    pub promoted_literals: u64,
}

impl GeneratorStats {
    pub fn emitted(&self) -> u64 {
        self.regression_emitted + self.error_emitted
    }
}

/// One emitted test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    /// SHA-256 of the sequence text.
    pub fingerprint: String,
    pub statements: usize,
    pub checks: TestChecks,
}

impl TestSummary {
    pub fn of(seq: &ExecutableSequence) -> Self {
        Self {
            fingerprint: seq.sequence().fingerprint(),
            statements: seq.len(),
            checks: seq.checks().clone(),
        }
    }
}

/// Complete report from a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: Uuid,
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub stop_reason: StopReason,
    pub stats: GeneratorStats,
    /// Distinct types in the component pool.
    pub pool_types: usize,
    /// Bucket entries in the component pool.
    pub pool_entries: usize,
    pub regression_tests: Vec<TestSummary>,
    pub error_tests: Vec<TestSummary>,
}
