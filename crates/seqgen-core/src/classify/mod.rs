//! Outcome classification and check generation.

pub mod behavior;
pub mod check_gen;
pub mod checks;
pub mod contract;

pub use behavior::{classify_fault, BehaviorPolicy, BehaviorType, FaultCategory};
pub use check_gen::{CheckGenerator, Classification, DiscardReason, Disposition, NoChecks, OutcomeClassifier};
pub use checks::{
    ContractViolation, ExceptionCheck, ExceptionCheckKind, RegressionCheck, RegressionCheckKind,
    TestChecks,
};
pub use contract::{Contract, ContractSet, EqualsReflexive, FnContract};
