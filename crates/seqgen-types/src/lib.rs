//! Shared types for the seqgen workspace.
//!
//! This crate holds the vocabulary every other crate speaks:
//!
//! - [`Type`] / [`TypeHierarchy`] - declared types and the subtype relation
//! - [`Value`] - runtime values, including literal text encoding
//! - [`Operation`] - operation signatures with stable, parseable ids

pub mod hierarchy;
pub mod operation;
pub mod types;
pub mod value;

pub use hierarchy::TypeHierarchy;
pub use operation::{Operation, OperationKind, OperationParseError};
pub use types::{PrimitiveType, Type, TypeName, TypeParseError, OBJECT_TYPE_NAME, STRING_TYPE_NAME};
pub use value::{LiteralError, ObjectRef, Value};
