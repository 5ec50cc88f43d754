//! Operations of the system under test.
//!
//! An [`Operation`] is an immutable signature: declared input types, a
//! declared output type and a kind. Each operation has a stable textual id
//! that round-trips through [`FromStr`]:
//!
//! ```text
//! prim:<type>:<value>
//! cons:<Decl>(<params>)
//! method:<Decl>.<name>(<params>)-><out>
//! static:<Decl>.<name>(<params>)-><out>
//! getter:<Decl>.<field>:<type>          static-getter:<Decl>.<field>:<type>
//! setter:<Decl>.<field>:<type>          static-setter:<Decl>.<field>:<type>
//! ```
//!
//! Instance methods list their parameters without the receiver in the id,
//! but the receiver is input 0 of `input_types`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Type, TypeParseError};
use crate::value::{LiteralError, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Constructor,
    InstanceMethod,
    StaticMethod,
    FieldGet { is_static: bool },
    FieldSet { is_static: bool },
    Literal,
}

impl OperationKind {
    fn id_prefix(&self) -> &'static str {
        match self {
            OperationKind::Constructor => "cons",
            OperationKind::InstanceMethod => "method",
            OperationKind::StaticMethod => "static",
            OperationKind::FieldGet { is_static: false } => "getter",
            OperationKind::FieldGet { is_static: true } => "static-getter",
            OperationKind::FieldSet { is_static: false } => "setter",
            OperationKind::FieldSet { is_static: true } => "static-setter",
            OperationKind::Literal => "prim",
        }
    }

    /// Kinds whose first input is a receiver object.
    pub fn has_receiver(&self) -> bool {
        matches!(
            self,
            OperationKind::InstanceMethod
                | OperationKind::FieldGet { is_static: false }
                | OperationKind::FieldSet { is_static: false }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationParseError {
    #[error("malformed operation id {id:?}: {reason}")]
    Malformed { id: String, reason: &'static str },
    #[error(transparent)]
    Type(#[from] TypeParseError),
    #[error(transparent)]
    Literal(#[from] LiteralError),
}

/// An operation signature. Equality and hashing use the id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Operation {
    kind: OperationKind,
    declaring_type: Type,
    name: String,
    input_types: Vec<Type>,
    output_type: Type,
    literal: Option<Value>,
    id: String,
}

impl Operation {
    pub fn constructor(declaring_type: Type, params: Vec<Type>) -> Self {
        let id = format!("cons:{}({})", declaring_type, join_types(&params));
        Self {
            kind: OperationKind::Constructor,
            output_type: declaring_type.clone(),
            declaring_type,
            name: "<init>".to_string(),
            input_types: params,
            literal: None,
            id,
        }
    }

    /// Instance method; the receiver of type `declaring_type` is prepended
    /// to `params` as input 0.
    pub fn instance_method(
        declaring_type: Type,
        name: &str,
        params: Vec<Type>,
        output_type: Type,
    ) -> Self {
        let id = format!(
            "method:{}.{}({})->{}",
            declaring_type,
            name,
            join_types(&params),
            output_type
        );
        let mut input_types = Vec::with_capacity(params.len() + 1);
        input_types.push(declaring_type.clone());
        input_types.extend(params);
        Self {
            kind: OperationKind::InstanceMethod,
            declaring_type,
            name: name.to_string(),
            input_types,
            output_type,
            literal: None,
            id,
        }
    }

    pub fn static_method(
        declaring_type: Type,
        name: &str,
        params: Vec<Type>,
        output_type: Type,
    ) -> Self {
        let id = format!(
            "static:{}.{}({})->{}",
            declaring_type,
            name,
            join_types(&params),
            output_type
        );
        Self {
            kind: OperationKind::StaticMethod,
            declaring_type,
            name: name.to_string(),
            input_types: params,
            output_type,
            literal: None,
            id,
        }
    }

    pub fn field_get(declaring_type: Type, field: &str, field_type: Type, is_static: bool) -> Self {
        let kind = OperationKind::FieldGet { is_static };
        let id = format!("{}:{}.{}:{}", kind.id_prefix(), declaring_type, field, field_type);
        let input_types = if is_static {
            Vec::new()
        } else {
            vec![declaring_type.clone()]
        };
        Self {
            kind,
            declaring_type,
            name: field.to_string(),
            input_types,
            output_type: field_type,
            literal: None,
            id,
        }
    }

    pub fn field_set(declaring_type: Type, field: &str, field_type: Type, is_static: bool) -> Self {
        let kind = OperationKind::FieldSet { is_static };
        let id = format!("{}:{}.{}:{}", kind.id_prefix(), declaring_type, field, field_type);
        let input_types = if is_static {
            vec![field_type]
        } else {
            vec![declaring_type.clone(), field_type]
        };
        Self {
            kind,
            declaring_type,
            name: field.to_string(),
            input_types,
            output_type: Type::Void,
            literal: None,
            id,
        }
    }

    /// Zero-input operation producing the fixed `value` of type `ty`.
    pub fn literal(ty: Type, value: Value) -> Result<Self, LiteralError> {
        if !ty.admits_literals() && !(ty.is_reference() && value.is_null()) {
            return Err(LiteralError::NotLiteralType(ty.to_string()));
        }
        if !value.is_valid_literal_of(&ty) {
            return Err(LiteralError::Mismatch {
                ty: ty.to_string(),
                value: value.to_string(),
            });
        }
        let id = format!("prim:{}:{}", ty, value.to_literal_text());
        Ok(Self {
            kind: OperationKind::Literal,
            declaring_type: ty.clone(),
            name: "literal".to_string(),
            input_types: Vec::new(),
            output_type: ty,
            literal: Some(value),
            id,
        })
    }

    /// Literal of the default value for `ty` (see [`Value::zero_for`]).
    pub fn null_or_zero(ty: &Type) -> Result<Self, LiteralError> {
        let value =
            Value::zero_for(ty).ok_or_else(|| LiteralError::NotLiteralType(ty.to_string()))?;
        Self::literal(ty.clone(), value)
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn declaring_type(&self) -> &Type {
        &self.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_types(&self) -> &[Type] {
        &self.input_types
    }

    pub fn arity(&self) -> usize {
        self.input_types.len()
    }

    pub fn output_type(&self) -> &Type {
        &self.output_type
    }

    pub fn is_static(&self) -> bool {
        !self.kind.has_receiver()
    }

    pub fn is_literal(&self) -> bool {
        self.kind == OperationKind::Literal
    }

    pub fn literal_value(&self) -> Option<&Value> {
        self.literal.as_ref()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_receiver_position(&self, index: usize) -> bool {
        index == 0 && self.kind.has_receiver()
    }
}

fn join_types(types: &[Type]) -> String {
    types
        .iter()
        .map(Type::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Operation {}

impl Hash for Operation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl FromStr for Operation {
    type Err = OperationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| OperationParseError::Malformed {
            id: s.to_string(),
            reason,
        };
        let (prefix, rest) = s.split_once(':').ok_or_else(|| malformed("missing kind prefix"))?;
        match prefix {
            "prim" => {
                let (ty, text) = rest
                    .split_once(':')
                    .ok_or_else(|| malformed("missing literal value"))?;
                let ty: Type = ty.parse()?;
                let value = Value::parse_literal(&ty, text)?;
                Ok(Operation::literal(ty, value)?)
            }
            "cons" => {
                let (decl, params) = split_call(rest).ok_or_else(|| malformed("bad parameter list"))?;
                Ok(Operation::constructor(decl.parse()?, parse_params(params)?))
            }
            "method" | "static" => {
                let (call, out) = rest
                    .rsplit_once("->")
                    .ok_or_else(|| malformed("missing return type"))?;
                let (head, params) = split_call(call).ok_or_else(|| malformed("bad parameter list"))?;
                let (decl, name) = head
                    .rsplit_once('.')
                    .ok_or_else(|| malformed("missing method name"))?;
                let params = parse_params(params)?;
                let decl: Type = decl.parse()?;
                let out: Type = out.parse()?;
                Ok(if prefix == "method" {
                    Operation::instance_method(decl, name, params, out)
                } else {
                    Operation::static_method(decl, name, params, out)
                })
            }
            "getter" | "static-getter" | "setter" | "static-setter" => {
                let (path, ty) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| malformed("missing field type"))?;
                let (decl, field) = path
                    .rsplit_once('.')
                    .ok_or_else(|| malformed("missing field name"))?;
                let is_static = prefix.starts_with("static");
                let decl: Type = decl.parse()?;
                let ty: Type = ty.parse()?;
                Ok(if prefix.ends_with("getter") {
                    Operation::field_get(decl, field, ty, is_static)
                } else {
                    Operation::field_set(decl, field, ty, is_static)
                })
            }
            _ => Err(malformed("unknown kind prefix")),
        }
    }
}

/// Splits `Head(a,b)` into `("Head", "a,b")`.
fn split_call(s: &str) -> Option<(&str, &str)> {
    let (head, tail) = s.split_once('(')?;
    Some((head, tail.strip_suffix(')')?))
}

fn parse_params(params: &str) -> Result<Vec<Type>, TypeParseError> {
    if params.is_empty() {
        return Ok(Vec::new());
    }
    params.split(',').map(str::parse).collect()
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        op.id
    }
}

impl TryFrom<String> for Operation {
    type Error = OperationParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Type {
        Type::reference("bank.Account")
    }

    #[test]
    fn test_instance_method_prepends_receiver() {
        let op = Operation::instance_method(account(), "deposit", vec![Type::int()], Type::Void);
        assert_eq!(op.id(), "method:bank.Account.deposit(int)->void");
        assert_eq!(op.input_types(), &[account(), Type::int()]);
        assert!(op.is_receiver_position(0));
        assert!(!op.is_receiver_position(1));
        assert!(!op.is_static());
    }

    #[test]
    fn test_ids_round_trip() {
        let ops = vec![
            Operation::constructor(account(), vec![]),
            Operation::constructor(account(), vec![Type::string(), Type::long()]),
            Operation::instance_method(account(), "balance", vec![], Type::long()),
            Operation::static_method(account(), "of", vec![Type::int()], account()),
            Operation::field_get(account(), "owner", Type::string(), false),
            Operation::field_set(account(), "LIMIT", Type::int(), true),
            Operation::literal(Type::string(), Value::Str("a:b (c)".into())).unwrap(),
            Operation::literal(Type::Primitive(crate::PrimitiveType::Char), Value::Char('#'))
                .unwrap(),
            Operation::null_or_zero(&account()).unwrap(),
        ];
        for op in ops {
            let parsed: Operation = op.id().parse().unwrap();
            assert_eq!(parsed, op);
            assert_eq!(parsed.input_types(), op.input_types());
            assert_eq!(parsed.output_type(), op.output_type());
            assert_eq!(parsed.kind(), op.kind());
        }
    }

    #[test]
    fn test_literal_rejects_mismatched_values() {
        assert!(Operation::literal(Type::int(), Value::Long(1)).is_err());
        assert!(Operation::literal(account(), Value::Str("x".into())).is_err());
        assert!(Operation::literal(Type::Void, Value::Null).is_err());
        let null = Operation::literal(account(), Value::Null).unwrap();
        assert_eq!(null.id(), "prim:bank.Account:null");
        assert_eq!(null.arity(), 0);
    }

    #[test]
    fn test_setter_inputs_and_void_output() {
        let op = Operation::field_set(account(), "owner", Type::string(), false);
        assert_eq!(op.input_types(), &[account(), Type::string()]);
        assert!(op.output_type().is_void());
    }

    #[test]
    fn test_parse_errors() {
        assert!("bogus".parse::<Operation>().is_err());
        assert!("method:A.f(int)".parse::<Operation>().is_err());
        assert!("prim:int:abc".parse::<Operation>().is_err());
        assert!("cons:A(int".parse::<Operation>().is_err());
    }

    #[test]
    fn test_serializes_as_id() {
        let op = Operation::static_method(account(), "open", vec![], account());
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, "\"static:bank.Account.open()->bank.Account\"");
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }
}
