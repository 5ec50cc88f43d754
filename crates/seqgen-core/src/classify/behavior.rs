//! Fault categories and the user policy over them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::execution::outcome::{Fault, FaultKind};

/// How an exceptional outcome of a given category is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorType {
    /// Normal behavior; the test expects the fault.
    Expected,
    /// A bug; the test goes to the error suite.
    Error,
    /// Illegal use of the target; the candidate is discarded.
    Invalid,
}

impl fmt::Display for BehaviorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BehaviorType::Expected => "expected",
            BehaviorType::Error => "error",
            BehaviorType::Invalid => "invalid",
        })
    }
}

impl FromStr for BehaviorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "expected" => Ok(BehaviorType::Expected),
            "error" => Ok(BehaviorType::Error),
            "invalid" => Ok(BehaviorType::Invalid),
            other => Err(format!(
                "unknown behavior '{other}' (expected one of: expected, error, invalid)"
            )),
        }
    }
}

/// Closed set of fault categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultCategory {
    CheckedFault,
    UncheckedFault,
    /// Null dereference in a statement that received a null argument.
    NullOnNullInput,
    /// Null dereference although every argument was non-null.
    NullOnNonNullInput,
    ResourceExhaustion,
    Failure,
}

/// Map a fault and the null-input flag of its statement to a category.
pub fn classify_fault(fault: &Fault, null_input: bool) -> FaultCategory {
    match fault.kind {
        FaultKind::Checked => FaultCategory::CheckedFault,
        FaultKind::Unchecked => FaultCategory::UncheckedFault,
        FaultKind::NullDereference if null_input => FaultCategory::NullOnNullInput,
        FaultKind::NullDereference => FaultCategory::NullOnNonNullInput,
        FaultKind::ResourceExhaustion => FaultCategory::ResourceExhaustion,
        FaultKind::Failure => FaultCategory::Failure,
    }
}

/// Behavior per fault category. `Failure` is not configurable and always
/// maps to [`BehaviorType::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorPolicy {
    pub checked: BehaviorType,
    pub unchecked: BehaviorType,
    pub null_on_null_input: BehaviorType,
    pub null_on_non_null_input: BehaviorType,
    pub resource_exhaustion: BehaviorType,
}

impl Default for BehaviorPolicy {
    fn default() -> Self {
        Self {
            checked: BehaviorType::Expected,
            unchecked: BehaviorType::Expected,
            null_on_null_input: BehaviorType::Expected,
            null_on_non_null_input: BehaviorType::Error,
            resource_exhaustion: BehaviorType::Invalid,
        }
    }
}

impl BehaviorPolicy {
    pub fn behavior_for(&self, category: FaultCategory) -> BehaviorType {
        match category {
            FaultCategory::CheckedFault => self.checked,
            FaultCategory::UncheckedFault => self.unchecked,
            FaultCategory::NullOnNullInput => self.null_on_null_input,
            FaultCategory::NullOnNonNullInput => self.null_on_non_null_input,
            FaultCategory::ResourceExhaustion => self.resource_exhaustion,
            FaultCategory::Failure => BehaviorType::Error,
        }
    }
}
