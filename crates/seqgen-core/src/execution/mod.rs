//! Execution of sequences against an external executor.

pub mod executable;
pub mod outcome;
pub mod runner;
pub mod visitor;

pub use executable::ExecutableSequence;
pub use outcome::{Fault, FaultKind, Outcome};
pub use runner::{ExecutionMode, Executor, StatementRunner};
pub use visitor::{
    CoverageCollector, CoverageScope, CoverageVisitor, ExecutionVisitor, SharedCoverage, TraceVisitor,
};
