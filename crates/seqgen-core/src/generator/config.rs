//! Generator configuration.
//!
//! Every field has a default, so a JSON file only needs the keys it changes.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::duplicates::DuplicatePolicy;
use crate::classify::BehaviorPolicy;
use crate::errors::GeneratorError;
use crate::execution::ExecutionMode;

/// Stopping conditions and size bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Wall-clock budget for the whole run.
    pub time_limit_ms: Option<u64>,
    /// Maximum number of candidate attempts.
    pub input_limit: Option<u64>,
    /// Maximum number of emitted tests (both suites together).
    pub output_limit: Option<u64>,
    /// Candidates longer than this are discarded before execution.
    pub max_sequence_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            time_limit_ms: Some(100_000),
            input_limit: None,
            output_limit: None,
            max_sequence_length: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
    /// Budget for a single statement.
    pub statement_timeout_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Inline,
            statement_timeout_ms: 5_000,
        }
    }
}

impl ExecutionConfig {
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }
}

/// Which suites are emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Master switch; when off nothing is emitted.
    pub output_tests: bool,
    pub regression_tests: bool,
    pub error_tests: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_tests: true,
            regression_tests: true,
            error_tests: true,
        }
    }
}

impl OutputConfig {
    pub fn emits_anything(&self) -> bool {
        self.output_tests && (self.regression_tests || self.error_tests)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Seed of the single random source.
    pub seed: u64,
    pub limits: Limits,
    /// Probability of using null for a non-receiver reference input.
    pub null_ratio: f64,
    /// Never inject nulls, not even when the pool has no candidate.
    pub forbid_null: bool,
    pub behavior: BehaviorPolicy,
    /// Omit regression checks; expected faults get an empty check.
    pub no_regression_assertions: bool,
    pub execution: ExecutionConfig,
    pub output: OutputConfig,
    /// Heuristic suppressing pool insertion of repetitive sequences.
    pub duplicates: DuplicatePolicy,
    /// Turn new primitive and string values observed at runtime into
    /// literal sequences.
    pub promote_runtime_primitives: bool,
    /// Stop after the first emitted error-revealing test.
    pub stop_on_error_test: bool,
    /// Relative selection weight by operation id; unlisted operations weigh 1.
    pub operation_weights: HashMap<String, f64>,
    /// Keep a log of every random decision.
    pub record_decisions: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            limits: Limits::default(),
            null_ratio: 0.05,
            forbid_null: false,
            behavior: BehaviorPolicy::default(),
            no_regression_assertions: false,
            execution: ExecutionConfig::default(),
            output: OutputConfig::default(),
            duplicates: DuplicatePolicy::Off,
            promote_runtime_primitives: true,
            stop_on_error_test: false,
            operation_weights: HashMap::new(),
            record_decisions: false,
        }
    }
}

impl GeneratorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("failed to parse generator config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), GeneratorError> {
        let invalid = |msg: String| Err(GeneratorError::InvalidConfig(msg));
        if !(0.0..=1.0).contains(&self.null_ratio) {
            return invalid(format!("null_ratio must be within [0, 1], got {}", self.null_ratio));
        }
        if self.limits.max_sequence_length == 0 {
            return invalid("max_sequence_length must be at least 1".into());
        }
        if self.execution.statement_timeout_ms == 0 {
            return invalid("statement_timeout_ms must be positive".into());
        }
        if let Some((id, w)) = self
            .operation_weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return invalid(format!("weight for {id} must be finite and non-negative, got {w}"));
        }
        let output_can_stop = self.limits.output_limit.is_some() && self.output.emits_anything();
        if self.limits.time_limit_ms.is_none() && self.limits.input_limit.is_none() && !output_can_stop
        {
            return invalid(
                "no reachable stopping condition: set time_limit_ms or input_limit \
                 (output_limit only counts emitted tests)"
                    .into(),
            );
        }
        self.duplicates.validate()
    }
}
