//! Declared types of operation inputs and outputs.
//!
//! Types are identified by name. Primitive types use their short names
//! (`int`, `boolean`, ...); every other name denotes a reference type.
//! `String` is a reference type that also admits literal values.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the implicit root of the reference type hierarchy.
pub const OBJECT_TYPE_NAME: &str = "Object";

/// Name of the string type.
pub const STRING_TYPE_NAME: &str = "String";

/// Shared, cheaply clonable type name.
pub type TypeName = Arc<str>;

/// Primitive (value) types. These are only ever assignable to themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Char,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Char => "char",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a type name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeParseError {
    #[error("type name is empty")]
    Empty,
    #[error("type name {name:?} contains invalid character {ch:?}")]
    InvalidCharacter { name: String, ch: char },
}

/// A declared type.
///
/// Serialized as its name, so reports and config files read `"int"` or
/// `"Account"` rather than a tagged structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Type {
    Void,
    Primitive(PrimitiveType),
    Reference(TypeName),
}

impl Type {
    pub fn reference(name: &str) -> Self {
        Type::Reference(Arc::from(name))
    }

    pub fn object() -> Self {
        Self::reference(OBJECT_TYPE_NAME)
    }

    pub fn string() -> Self {
        Self::reference(STRING_TYPE_NAME)
    }

    pub fn int() -> Self {
        Type::Primitive(PrimitiveType::Int)
    }

    pub fn long() -> Self {
        Type::Primitive(PrimitiveType::Long)
    }

    pub fn boolean() -> Self {
        Type::Primitive(PrimitiveType::Boolean)
    }

    pub fn double() -> Self {
        Type::Primitive(PrimitiveType::Double)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Reference(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::Reference(name) if name.as_ref() == STRING_TYPE_NAME)
    }

    /// True for types whose values can be written down as literals
    /// (primitives and `String`).
    pub fn admits_literals(&self) -> bool {
        self.is_primitive() || self.is_string()
    }

    pub fn name(&self) -> &str {
        match self {
            Type::Void => "void",
            Type::Primitive(p) => p.name(),
            Type::Reference(name) => name,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Type {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(TypeParseError::Empty);
        }
        if s == "void" {
            return Ok(Type::Void);
        }
        if let Some(p) = PrimitiveType::from_name(s) {
            return Ok(Type::Primitive(p));
        }
        // Characters reserved by the operation and sequence text formats.
        if let Some(ch) = s
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, ',' | '(' | ')' | ':' | '='))
        {
            return Err(TypeParseError::InvalidCharacter {
                name: s.to_string(),
                ch,
            });
        }
        Ok(Type::reference(s))
    }
}

impl From<Type> for String {
    fn from(ty: Type) -> Self {
        ty.to_string()
    }
}

impl TryFrom<String> for Type {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
