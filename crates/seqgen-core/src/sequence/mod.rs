//! Immutable sequence model.
//!
//! A [`Sequence`] is an ordered list of [`Statement`]s. Statement `i` produces
//! the value `var<i>`; its inputs reference strictly earlier statements of the
//! same sequence, so sequences are acyclic by construction. Extension always
//! returns a new sequence.
//!
//! Sequences print to (and parse from) a line-oriented text form:
//!
//! ```text
//! var0 = prim:int:5 :
//! var1 = cons:Account() :
//! var2 = method:Account.deposit(int)->void : var1 var0
//! ```

pub mod mutable;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use seqgen_types::{Operation, Type, TypeHierarchy};

use crate::errors::SequenceError;

pub use mutable::{MutableSequence, MutableStatement, VarId};

/// One operation applied to the outputs of earlier statements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    operation: Arc<Operation>,
    inputs: Vec<usize>,
}

impl Statement {
    pub fn new(operation: Arc<Operation>, inputs: Vec<usize>) -> Result<Self, SequenceError> {
        if operation.arity() != inputs.len() {
            return Err(SequenceError::ArityMismatch {
                operation: operation.id().to_string(),
                expected: operation.arity(),
                actual: inputs.len(),
            });
        }
        Ok(Self { operation, inputs })
    }

    pub fn operation(&self) -> &Arc<Operation> {
        &self.operation
    }

    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    pub fn output_type(&self) -> &Type {
        self.operation.output_type()
    }

    pub fn is_literal(&self) -> bool {
        self.operation.is_literal()
    }
}

/// Structural key over the last `k` statements of a sequence. Inputs are
/// stored as backwards offsets so equal suffixes of different sequences
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuffixKey(Vec<(Arc<Operation>, Vec<usize>)>);

/// Immutable sequence of statements plus per-position active flags.
///
/// Equality and hashing are structural over the statements only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Sequence {
    statements: Vec<Statement>,
    active: Vec<bool>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-statement sequence for a zero-input operation.
    pub fn literal(operation: Arc<Operation>) -> Result<Self, SequenceError> {
        Self::new().extend(operation, Vec::new())
    }

    /// Build a sequence from statements, checking arity and that every input
    /// refers to a strictly earlier statement.
    pub fn from_statements(statements: Vec<Statement>) -> Result<Self, SequenceError> {
        let mut seq = Self::new();
        for stmt in statements {
            seq = seq.extend(stmt.operation, stmt.inputs)?;
        }
        Ok(seq)
    }

    /// New sequence with one more statement. The new position is active
    /// unless the operation returns `void`.
    pub fn extend(
        &self,
        operation: Arc<Operation>,
        inputs: Vec<usize>,
    ) -> Result<Sequence, SequenceError> {
        let index = self.statements.len();
        if let Some(&bad) = inputs.iter().find(|&&i| i >= index) {
            return Err(SequenceError::ForwardReference {
                statement: index,
                input: bad,
            });
        }
        let stmt = Statement::new(operation, inputs)?;
        let mut statements = Vec::with_capacity(index + 1);
        statements.extend_from_slice(&self.statements);
        let mut active = Vec::with_capacity(index + 1);
        active.extend_from_slice(&self.active);
        active.push(!stmt.output_type().is_void());
        statements.push(stmt);
        Ok(Sequence { statements, active })
    }

    pub(crate) fn from_parts(statements: Vec<Statement>, active: Vec<bool>) -> Self {
        debug_assert_eq!(statements.len(), active.len());
        Self { statements, active }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn statement(&self, index: usize) -> Option<&Statement> {
        self.statements.get(index)
    }

    pub fn last(&self) -> Option<&Statement> {
        self.statements.last()
    }

    pub fn output_type(&self, index: usize) -> Option<&Type> {
        self.statements.get(index).map(Statement::output_type)
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.active.get(index).copied().unwrap_or(false)
    }

    /// Only meaningful before the sequence is shared through the pool.
    pub fn set_active(&mut self, index: usize, active: bool) {
        if let Some(flag) = self.active.get_mut(index) {
            // void outputs can never be reused
            *flag = active && !self.statements[index].output_type().is_void();
        }
    }

    pub fn clear_active_flags(&mut self) {
        self.active.iter_mut().for_each(|f| *f = false);
    }

    pub fn active_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(i, &a)| a.then_some(i))
    }

    pub fn has_active_flags(&self) -> bool {
        self.active.iter().any(|&a| a)
    }

    /// Active positions whose declared type may be used where `ty` is required.
    pub fn positions_usable_as(&self, ty: &Type, hierarchy: &TypeHierarchy) -> Vec<usize> {
        self.active_positions()
            .filter(|&i| hierarchy.is_assignable(ty, self.statements[i].output_type()))
            .collect()
    }

    /// Full well-formedness check: arity, backward references and declared
    /// assignability of every input.
    pub fn check_well_formed(&self, hierarchy: &TypeHierarchy) -> Result<(), SequenceError> {
        for (index, stmt) in self.statements.iter().enumerate() {
            let op = stmt.operation();
            if op.arity() != stmt.inputs.len() {
                return Err(SequenceError::ArityMismatch {
                    operation: op.id().to_string(),
                    expected: op.arity(),
                    actual: stmt.inputs.len(),
                });
            }
            for (position, (&input, expected)) in
                stmt.inputs.iter().zip(op.input_types()).enumerate()
            {
                if input >= index {
                    return Err(SequenceError::ForwardReference {
                        statement: index,
                        input,
                    });
                }
                let actual = self.statements[input].output_type();
                if !hierarchy.is_assignable(expected, actual) {
                    return Err(SequenceError::TypeMismatch {
                        statement: index,
                        position,
                        expected: expected.clone(),
                        actual: actual.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether any statement declares, produces or consumes a type whose
    /// name matches `pattern`.
    pub fn uses_type_matching(&self, pattern: &Regex) -> bool {
        self.statements.iter().any(|s| {
            let op = s.operation();
            pattern.is_match(op.declaring_type().name())
                || pattern.is_match(op.output_type().name())
                || op.input_types().iter().any(|t| pattern.is_match(t.name()))
        })
    }

    /// Structural key of the last `k` statements (all of them if shorter).
    pub fn suffix_key(&self, k: usize) -> SuffixKey {
        let start = self.statements.len().saturating_sub(k);
        SuffixKey(
            self.statements[start..]
                .iter()
                .enumerate()
                .map(|(offset, s)| {
                    let index = start + offset;
                    let relative = s.inputs.iter().map(|&i| index - i).collect();
                    (s.operation.clone(), relative)
                })
                .collect(),
        )
    }

    /// Hex SHA-256 of the text form.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.to_string().as_bytes());
        hex::encode(digest)
    }

    pub fn parse(text: &str) -> Result<Self, SequenceError> {
        text.parse()
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.statements == other.statements
    }
}

impl Eq for Sequence {}

impl Hash for Sequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.statements.hash(state);
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.statements.iter().enumerate() {
            write!(f, "var{} = {} :", i, stmt.operation)?;
            for input in &stmt.inputs {
                write!(f, " var{input}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl FromStr for Sequence {
    type Err = SequenceError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut seq = Sequence::new();
        for (line_no, line) in text.lines().map(str::trim).filter(|l| !l.is_empty()).enumerate() {
            let parse_err = |reason: String| SequenceError::Parse {
                line: line_no,
                reason,
            };
            let (var, rest) = line
                .split_once(" = ")
                .ok_or_else(|| parse_err("expected `var<i> = <operation> : <inputs>`".into()))?;
            if var != format!("var{line_no}") {
                return Err(parse_err(format!("expected var{line_no}, found {var}")));
            }
            let (op_text, inputs_text) = match rest.strip_suffix(" :") {
                Some(op) => (op, ""),
                None => rest
                    .rsplit_once(" : ")
                    .ok_or_else(|| parse_err("missing ` : ` separator".into()))?,
            };
            let operation: Operation = op_text
                .parse()
                .map_err(|source| SequenceError::Operation {
                    line: line_no,
                    source,
                })?;
            let inputs = inputs_text
                .split_whitespace()
                .map(|name| {
                    name.strip_prefix("var")
                        .and_then(|n| n.parse::<usize>().ok())
                        .ok_or_else(|| SequenceError::UnknownVariable(name.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            seq = seq.extend(Arc::new(operation), inputs)?;
        }
        Ok(seq)
    }
}

impl From<Sequence> for String {
    fn from(seq: Sequence) -> Self {
        seq.to_string()
    }
}

impl TryFrom<String> for Sequence {
    type Error = SequenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqgen_types::Value;

    fn account() -> Type {
        Type::reference("Account")
    }

    fn ops() -> (Arc<Operation>, Arc<Operation>, Arc<Operation>) {
        let five = Arc::new(Operation::literal(Type::int(), Value::Int(5)).unwrap());
        let new = Arc::new(Operation::constructor(account(), vec![]));
        let deposit = Arc::new(Operation::instance_method(
            account(),
            "deposit",
            vec![Type::int()],
            Type::Void,
        ));
        (five, new, deposit)
    }

    fn sample() -> Sequence {
        let (five, new, deposit) = ops();
        Sequence::literal(five)
            .unwrap()
            .extend(new, vec![])
            .unwrap()
            .extend(deposit, vec![1, 0])
            .unwrap()
    }

    #[test]
    fn test_extend_checks_arity_and_order() {
        let (five, new, deposit) = ops();
        let seq = Sequence::new().extend(new, vec![]).unwrap();
        assert!(matches!(
            seq.extend(deposit.clone(), vec![0]),
            Err(SequenceError::ArityMismatch { .. })
        ));
        assert!(matches!(
            seq.extend(deposit, vec![0, 1]),
            Err(SequenceError::ForwardReference { statement: 1, input: 1 })
        ));
        assert!(Sequence::literal(five).unwrap().len() == 1);
    }

    #[test]
    fn test_extend_leaves_original_untouched() {
        let seq = sample();
        let (five, _, _) = ops();
        let longer = seq.extend(five, vec![]).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(longer.len(), 4);
    }

    #[test]
    fn test_void_outputs_are_inactive() {
        let mut seq = sample();
        assert_eq!(seq.active_positions().collect::<Vec<_>>(), vec![0, 1]);
        seq.set_active(2, true);
        assert!(!seq.is_active(2));
        seq.set_active(0, false);
        assert_eq!(seq.active_positions().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_well_formedness_detects_type_mismatch() {
        let h = TypeHierarchy::new();
        assert!(sample().check_well_formed(&h).is_ok());

        let (five, _, deposit) = ops();
        // int literal used as receiver
        let bad = Sequence::literal(five).unwrap().extend(deposit, vec![0, 0]).unwrap();
        assert!(matches!(
            bad.check_well_formed(&h),
            Err(SequenceError::TypeMismatch { statement: 1, position: 0, .. })
        ));
    }

    #[test]
    fn test_text_form_round_trips() {
        let seq = sample();
        let text = seq.to_string();
        assert!(text.starts_with("var0 = prim:int:5 :\n"));
        assert!(text.contains("var2 = method:Account.deposit(int)->void : var1 var0"));
        let parsed: Sequence = text.parse().unwrap();
        assert_eq!(parsed, seq);
        assert_eq!(parsed.fingerprint(), seq.fingerprint());
    }

    #[test]
    fn test_parse_rejects_bad_numbering() {
        let err = "var1 = cons:Account() :".parse::<Sequence>().unwrap_err();
        assert!(matches!(err, SequenceError::Parse { line: 0, .. }));
        let err = "var0 = cons:Account() : var0".parse::<Sequence>().unwrap_err();
        assert!(matches!(err, SequenceError::ForwardReference { statement: 0, input: 0 }));
        let err = "var0 = cons:Account() :\nvar1 = cons:Account() : var0"
            .parse::<Sequence>()
            .unwrap_err();
        assert!(matches!(err, SequenceError::ArityMismatch { .. }));
    }

    #[test]
    fn test_string_literal_with_separator_parses() {
        let op = Arc::new(Operation::literal(Type::string(), Value::Str("a : b :".into())).unwrap());
        let seq = Sequence::literal(op).unwrap();
        let parsed: Sequence = seq.to_string().parse().unwrap();
        assert_eq!(parsed, seq);
    }

    #[test]
    fn test_suffix_key_is_position_independent() {
        let (five, new, deposit) = ops();
        let a = sample();
        let b = Sequence::literal(five.clone())
            .unwrap()
            .extend(five, vec![])
            .unwrap()
            .extend(new, vec![])
            .unwrap()
            .extend(deposit, vec![2, 1])
            .unwrap();
        assert_eq!(a.suffix_key(2), b.suffix_key(2));
        assert_ne!(a.suffix_key(4), b.suffix_key(4));
        assert_ne!(a, b);
    }

    #[test]
    fn test_uses_type_matching() {
        let seq = sample();
        assert!(seq.uses_type_matching(&Regex::new("^Acc").unwrap()));
        assert!(!seq.uses_type_matching(&Regex::new("Dog").unwrap()));
    }

    #[test]
    fn test_positions_usable_as_respects_hierarchy() {
        let dog = Type::reference("Dog");
        let new_dog = Arc::new(Operation::constructor(dog, vec![]));
        let seq = Sequence::literal(new_dog).unwrap();
        let h = TypeHierarchy::new().with_subtype("Dog", "Animal");
        assert_eq!(seq.positions_usable_as(&Type::reference("Animal"), &h), vec![0]);
        assert!(seq.positions_usable_as(&Type::reference("Cat"), &h).is_empty());
    }
}
