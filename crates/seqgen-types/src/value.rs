//! Runtime values produced and consumed by operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hierarchy::TypeHierarchy;
use crate::types::{PrimitiveType, Type};

/// Handle to an object living inside the system under test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub type_name: String,
    pub id: u64,
}

/// A value observed at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Boolean(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Object(ObjectRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("type {0} does not admit literal values")]
    NotLiteralType(String),
    #[error("cannot parse {text:?} as a {ty} literal")]
    Unparseable { ty: String, text: String },
    #[error("value {value} is not a valid literal of type {ty}")]
    Mismatch { ty: String, value: String },
}

impl Value {
    pub fn object(type_name: impl Into<String>, id: u64) -> Self {
        Value::Object(ObjectRef {
            type_name: type_name.into(),
            id,
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Primitive values and strings, the values that can be promoted into
    /// literal operations.
    pub fn is_primitive_like(&self) -> bool {
        !matches!(self, Value::Null | Value::Object(_))
    }

    /// The primitive type of this value, if it has one.
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        Some(match self {
            Value::Boolean(_) => PrimitiveType::Boolean,
            Value::Char(_) => PrimitiveType::Char,
            Value::Byte(_) => PrimitiveType::Byte,
            Value::Short(_) => PrimitiveType::Short,
            Value::Int(_) => PrimitiveType::Int,
            Value::Long(_) => PrimitiveType::Long,
            Value::Float(_) => PrimitiveType::Float,
            Value::Double(_) => PrimitiveType::Double,
            _ => return None,
        })
    }

    /// The dynamic type of a non-null value.
    pub fn runtime_type(&self) -> Option<Type> {
        match self {
            Value::Null => None,
            Value::Str(_) => Some(Type::string()),
            Value::Object(obj) => Some(Type::reference(&obj.type_name)),
            other => other.primitive_type().map(Type::Primitive),
        }
    }

    /// Whether this value may be held by a variable of declared type `ty`.
    pub fn conforms_to(&self, ty: &Type, hierarchy: &TypeHierarchy) -> bool {
        match (self, ty) {
            (_, Type::Void) => false,
            (Value::Null, Type::Reference(_)) => true,
            (Value::Null, Type::Primitive(_)) => false,
            (value, ty) => match value.runtime_type() {
                Some(actual) => hierarchy.is_assignable(ty, &actual),
                None => false,
            },
        }
    }

    /// The default literal for a type: `""` for strings, `'a'` for chars,
    /// `false` for booleans, zero for numbers and null for other references.
    pub fn zero_for(ty: &Type) -> Option<Value> {
        Some(match ty {
            Type::Void => return None,
            Type::Reference(_) if ty.is_string() => Value::Str(String::new()),
            Type::Reference(_) => Value::Null,
            Type::Primitive(p) => match p {
                PrimitiveType::Boolean => Value::Boolean(false),
                PrimitiveType::Char => Value::Char('a'),
                PrimitiveType::Byte => Value::Byte(0),
                PrimitiveType::Short => Value::Short(0),
                PrimitiveType::Int => Value::Int(0),
                PrimitiveType::Long => Value::Long(0),
                PrimitiveType::Float => Value::Float(0.0),
                PrimitiveType::Double => Value::Double(0.0),
            },
        })
    }

    /// Whether this value is an acceptable literal of type `ty`. Reference
    /// types admit `null`; strings also admit string values.
    pub fn is_valid_literal_of(&self, ty: &Type) -> bool {
        match (self, ty) {
            (Value::Null, Type::Reference(_)) => true,
            (Value::Str(_), t) => t.is_string(),
            (Value::Object(_), _) | (Value::Null, _) => false,
            (v, Type::Primitive(p)) => v.primitive_type() == Some(*p),
            _ => false,
        }
    }

    /// Text form used inside literal operation ids. Chars are written as
    /// hex code points and strings are quoted with escapes.
    pub fn to_literal_text(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Char(c) => format!("{:04x}", *c as u32),
            Value::Byte(v) => v.to_string(),
            Value::Short(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Float(v) => format!("{v:?}"),
            Value::Double(v) => format!("{v:?}"),
            Value::Str(s) => quote(s),
            Value::Object(obj) => format!("<{}#{}>", obj.type_name, obj.id),
        }
    }

    /// Inverse of [`to_literal_text`](Self::to_literal_text) for literal types.
    pub fn parse_literal(ty: &Type, text: &str) -> Result<Value, LiteralError> {
        let bad = || LiteralError::Unparseable {
            ty: ty.to_string(),
            text: text.to_string(),
        };
        if text == "null" && ty.is_reference() {
            return Ok(Value::Null);
        }
        match ty {
            Type::Void => Err(LiteralError::NotLiteralType(ty.to_string())),
            Type::Reference(_) if ty.is_string() => unquote(text).map(Value::Str).ok_or_else(bad),
            Type::Reference(_) => Err(LiteralError::NotLiteralType(ty.to_string())),
            Type::Primitive(p) => match p {
                PrimitiveType::Boolean => text.parse().map(Value::Boolean).map_err(|_| bad()),
                PrimitiveType::Char => u32::from_str_radix(text, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(Value::Char)
                    .ok_or_else(bad),
                PrimitiveType::Byte => text.parse().map(Value::Byte).map_err(|_| bad()),
                PrimitiveType::Short => text.parse().map(Value::Short).map_err(|_| bad()),
                PrimitiveType::Int => text.parse().map(Value::Int).map_err(|_| bad()),
                PrimitiveType::Long => text.parse().map(Value::Long).map_err(|_| bad()),
                PrimitiveType::Float => text.parse().map(Value::Float).map_err(|_| bad()),
                PrimitiveType::Double => text.parse().map(Value::Double).map_err(|_| bad()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Char(c) => write!(f, "{c:?}"),
            other => f.write_str(&other.to_literal_text()),
        }
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn unquote(text: &str) -> Option<String> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '"' {
            return None;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'u' => {
                if chars.next()? != '{' {
                    return None;
                }
                let mut hex = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        h => hex.push(h),
                    }
                }
                out.push(char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        assert_eq!(Value::zero_for(&Type::string()), Some(Value::Str(String::new())));
        assert_eq!(
            Value::zero_for(&Type::Primitive(PrimitiveType::Char)),
            Some(Value::Char('a'))
        );
        assert_eq!(Value::zero_for(&Type::reference("Account")), Some(Value::Null));
        assert_eq!(Value::zero_for(&Type::Void), None);
    }

    #[test]
    fn test_string_literal_escapes() {
        let tricky = "say \"hi\"\n\\ \u{1}";
        let text = Value::Str(tricky.to_string()).to_literal_text();
        assert!(!text.contains('\n'));
        assert_eq!(
            Value::parse_literal(&Type::string(), &text).unwrap(),
            Value::Str(tricky.to_string())
        );
        assert!(Value::parse_literal(&Type::string(), "unquoted").is_err());
    }

    #[test]
    fn test_char_literal_is_hex() {
        let ty = Type::Primitive(PrimitiveType::Char);
        assert_eq!(Value::Char('a').to_literal_text(), "0061");
        assert_eq!(Value::parse_literal(&ty, "0023").unwrap(), Value::Char('#'));
    }

    #[test]
    fn test_literal_validity() {
        assert!(Value::Int(3).is_valid_literal_of(&Type::int()));
        assert!(!Value::Int(3).is_valid_literal_of(&Type::long()));
        assert!(Value::Null.is_valid_literal_of(&Type::reference("Account")));
        assert!(!Value::Null.is_valid_literal_of(&Type::int()));
        assert!(!Value::Str("x".into()).is_valid_literal_of(&Type::object()));
        assert!(!Value::object("Account", 1).is_valid_literal_of(&Type::reference("Account")));
    }

    #[test]
    fn test_conformance_follows_hierarchy() {
        let h = TypeHierarchy::new().with_subtype("Dog", "Animal");
        let dog = Value::object("Dog", 7);
        assert!(dog.conforms_to(&Type::reference("Animal"), &h));
        assert!(!Value::object("Animal", 1).conforms_to(&Type::reference("Dog"), &h));
        assert!(Value::Null.conforms_to(&Type::reference("Dog"), &h));
        assert!(!Value::Null.conforms_to(&Type::int(), &h));
    }

    #[test]
    fn test_nan_double_literal_parses() {
        let text = Value::Double(f64::NAN).to_literal_text();
        match Value::parse_literal(&Type::double(), &text).unwrap() {
            Value::Double(d) => assert!(d.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
