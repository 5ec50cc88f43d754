//! Error taxonomy for the generation engine.
//!
//! Only malformed input (an inconsistent catalog, seed or configuration) and
//! internal defects are errors. Target faults, non-termination and reached
//! limits are absorbed into generator state and never surface here.

use seqgen_types::{LiteralError, OperationParseError, Type};
use thiserror::Error;

/// A sequence or statement that violates the sequence model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("operation {operation} takes {expected} inputs but {actual} were supplied")]
    ArityMismatch {
        operation: String,
        expected: usize,
        actual: usize,
    },
    #[error("statement {statement} references var{input}, which is not strictly earlier")]
    ForwardReference { statement: usize, input: usize },
    #[error("statement {statement} input {position}: {actual} is not assignable to {expected}")]
    TypeMismatch {
        statement: usize,
        position: usize,
        expected: Type,
        actual: Type,
    },
    #[error("index {index} is out of bounds for a sequence of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("unknown variable {0}")]
    UnknownVariable(String),
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("line {line}: {source}")]
    Operation {
        line: usize,
        #[source]
        source: OperationParseError,
    },
}

/// Fatal errors surfaced by the forward generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("operation catalog is empty")]
    EmptyCatalog,
    #[error("seed sequence {index} is malformed: {source}")]
    MalformedSeed {
        index: usize,
        #[source]
        source: SequenceError,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Literal(#[from] LiteralError),
    /// A candidate violated a model invariant while being built. This is a
    /// defect in the generator, not in the target.
    #[error("internal generator error: {0}")]
    Internal(#[from] SequenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_culprit() {
        let err = SequenceError::ArityMismatch {
            operation: "cons:A()".into(),
            expected: 0,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "operation cons:A() takes 0 inputs but 1 were supplied"
        );

        let err = GeneratorError::MalformedSeed {
            index: 2,
            source: SequenceError::ForwardReference {
                statement: 0,
                input: 0,
            },
        };
        assert!(err.to_string().starts_with("seed sequence 2 is malformed"));
    }
}
