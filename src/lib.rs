//! seqgen: feedback-directed random test generation
//!
//! Builds call sequences over a catalog of typed operations, executes them,
//! and sorts the results into a regression suite and an error-revealing
//! suite:
//!
//! - **Types**: operations, values and the subtype relation ([`seqgen_types`])
//! - **Engine**: sequences, component pool, execution, classification and
//!   the forward generator ([`seqgen_core`])
//! - **Demo**: a small in-process target used by the `seqgen` binary
//!
//! See [`ForwardGenerator`] for the entry point.

pub mod demo;

pub use seqgen_core::*;
pub use seqgen_types::{
    ObjectRef, OperationKind, PrimitiveType, TypeName, OBJECT_TYPE_NAME, STRING_TYPE_NAME,
};
