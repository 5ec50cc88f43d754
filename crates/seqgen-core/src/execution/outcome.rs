//! Per-statement execution outcomes.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use seqgen_types::Value;

/// Structural kind of a fault raised by the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// A declared, recoverable fault.
    Checked,
    /// An undeclared runtime fault.
    Unchecked,
    /// Dereference of a null value.
    NullDereference,
    /// Memory or similar resource exhaustion.
    ResourceExhaustion,
    /// Assertion failure, stack overflow or a panic in the executor.
    Failure,
}

/// A fault raised while executing one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    /// Fault type name, e.g. `IllegalArgumentException`.
    pub name: String,
    pub message: String,
}

impl Fault {
    pub fn new(kind: FaultKind, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn checked(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FaultKind::Checked, name, message)
    }

    pub fn unchecked(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FaultKind::Unchecked, name, message)
    }

    pub fn null_dereference(message: impl Into<String>) -> Self {
        Self::new(FaultKind::NullDereference, "NullPointerException", message)
    }

    pub fn resource_exhaustion(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ResourceExhaustion, "OutOfMemoryError", message)
    }

    pub fn failure(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FaultKind::Failure, name, message)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

/// Result of executing one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Outcome {
    /// Completed and produced a value (`Null` for void operations).
    Normal { value: Value, elapsed: Duration },
    /// Raised a fault.
    Exceptional { fault: Fault, elapsed: Duration },
    /// Exceeded its time budget.
    NonTerminating { budget: Duration },
    /// Not run, because an earlier statement did not complete normally.
    NotExecuted,
}

impl Outcome {
    pub fn normal(value: Value) -> Self {
        Outcome::Normal {
            value,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, Outcome::Normal { .. })
    }

    pub fn is_executed(&self) -> bool {
        !matches!(self, Outcome::NotExecuted)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Normal { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Outcome::Exceptional { fault, .. } => Some(fault),
            _ => None,
        }
    }
}
