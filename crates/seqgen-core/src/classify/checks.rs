//! Assertions attached to classified sequences.

use serde::{Deserialize, Serialize};

use seqgen_types::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", content = "value", rename_all = "snake_case")]
pub enum RegressionCheckKind {
    /// The primitive or string value observed.
    ObservedValue(Value),
    IsNull,
    NotNull,
}

/// Observed state of statement `index`, asserted in the regression suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionCheck {
    pub index: usize,
    pub kind: RegressionCheckKind,
}

impl RegressionCheck {
    /// Check for a value produced by a statement. Objects are only checked
    /// for non-nullness.
    pub fn for_value(index: usize, value: &Value) -> Self {
        let kind = match value {
            Value::Null => RegressionCheckKind::IsNull,
            Value::Object(_) => RegressionCheckKind::NotNull,
            other => RegressionCheckKind::ObservedValue(other.clone()),
        };
        Self { index, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionCheckKind {
    /// The fault is expected behavior.
    Expected,
    /// No fault should have been raised here.
    Error,
    /// The candidate exercised illegal behavior.
    Invalid,
    /// Expected fault recorded without asserting on it.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionCheck {
    pub index: usize,
    pub fault_name: String,
    pub kind: ExceptionCheckKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractViolation {
    pub index: usize,
    pub contract: String,
}

/// All checks derived for one sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestChecks {
    pub regression: Vec<RegressionCheck>,
    pub exception: Option<ExceptionCheck>,
    pub violations: Vec<ContractViolation>,
}

impl TestChecks {
    pub fn has_checks(&self) -> bool {
        !self.regression.is_empty() || self.exception.is_some() || !self.violations.is_empty()
    }

    pub fn count(&self) -> usize {
        self.regression.len() + usize::from(self.exception.is_some()) + self.violations.len()
    }

    pub fn has_error_behavior(&self) -> bool {
        !self.violations.is_empty()
            || matches!(&self.exception, Some(e) if e.kind == ExceptionCheckKind::Error)
    }

    pub fn has_invalid_behavior(&self) -> bool {
        matches!(&self.exception, Some(e) if e.kind == ExceptionCheckKind::Invalid)
    }
}
