//! Feedback-directed random test generation engine.
//!
//! The engine builds call sequences over a catalog of typed operations,
//! executes them through an external [`Executor`], and keeps what it learns:
//!
//! - [`sequence`] - immutable sequences, the mutable editing arena and the
//!   parseable text form
//! - [`pool`] - the subtype index and the type-indexed component pool
//! - [`execution`] - outcomes, inline/isolated statement execution, visitors
//! - [`classify`] - behavior policy, contracts and check generation
//! - [`filter`] - composable output predicates
//! - [`generator`] - the forward generation loop and its configuration
//! - [`report`] - serializable run reports
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use seqgen_core::{Fault, ForwardGenerator, GeneratorConfig, Operation, Type, Value};
//!
//! let counter = Type::reference("Counter");
//! let catalog = vec![
//!     Operation::constructor(counter.clone(), vec![]),
//!     Operation::instance_method(counter, "get", vec![], Type::int()),
//! ];
//! let executor = |op: &Operation, _: &[Value], _: Duration| -> Result<Value, Fault> {
//!     match op.name() {
//!         "<init>" => Ok(Value::object("Counter", 1)),
//!         _ => Ok(Value::Int(0)),
//!     }
//! };
//! let mut gen = ForwardGenerator::new(catalog, Arc::new(executor), GeneratorConfig::default())?;
//! let report = gen.explore()?;
//! println!("{} regression tests", report.stats.regression_emitted);
//! # Ok::<(), seqgen_core::GeneratorError>(())
//! ```

pub mod classify;
pub mod errors;
pub mod execution;
pub mod filter;
pub mod generator;
pub mod pool;
pub mod report;
pub mod seeds;
pub mod sequence;

pub use classify::{
    BehaviorPolicy, BehaviorType, CheckGenerator, Classification, Contract, ContractSet,
    Disposition, FaultCategory, OutcomeClassifier, TestChecks,
};
pub use errors::{GeneratorError, SequenceError};
pub use execution::{
    ExecutableSequence, ExecutionMode, ExecutionVisitor, Executor, Fault, FaultKind, Outcome,
    StatementRunner,
};
pub use filter::{TestPredicate, TestPredicateExt};
pub use generator::{Decision, DuplicatePolicy, ForwardGenerator, GeneratorConfig, Limits};
pub use pool::{ComponentPool, PoolView, SubTypeIndex};
pub use report::{GenerationReport, GeneratorStats, StopReason, TestSummary};
pub use sequence::{MutableSequence, Sequence, Statement};

pub use seqgen_types::{Operation, Type, TypeHierarchy, Value};
