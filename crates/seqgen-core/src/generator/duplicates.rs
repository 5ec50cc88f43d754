//! Pluggable heuristic against re-pooling repetitive sequences.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::GeneratorError;
use crate::sequence::{Sequence, SuffixKey};

/// When a sequence counts as a duplicate of one already pooled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Pool everything.
    #[default]
    Off,
    /// Same operations and wiring, ignoring the values of literals.
    Structural,
    /// Same last `length` statements (operations and relative wiring).
    Suffix { length: usize },
}

impl DuplicatePolicy {
    pub fn validate(&self) -> Result<(), GeneratorError> {
        match self {
            DuplicatePolicy::Suffix { length: 0 } => Err(GeneratorError::InvalidConfig(
                "duplicate suffix length must be at least 1".into(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ShapeKey(Vec<(String, Vec<usize>)>);

impl ShapeKey {
    fn of(seq: &Sequence) -> Self {
        ShapeKey(
            seq.statements()
                .iter()
                .map(|s| {
                    let op = s.operation();
                    let name = if op.is_literal() {
                        format!("prim:{}", op.output_type())
                    } else {
                        op.id().to_string()
                    };
                    (name, s.inputs().to_vec())
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateTracker {
    policy: DuplicatePolicy,
    shapes: HashSet<ShapeKey>,
    suffixes: HashSet<SuffixKey>,
}

impl DuplicateTracker {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Record `seq` and report whether it may enter the pool.
    pub fn admit(&mut self, seq: &Sequence) -> bool {
        match self.policy {
            DuplicatePolicy::Off => true,
            DuplicatePolicy::Structural => self.shapes.insert(ShapeKey::of(seq)),
            DuplicatePolicy::Suffix { length } => self.suffixes.insert(seq.suffix_key(length)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqgen_types::{Operation, Type, Value};
    use std::sync::Arc;

    fn add_seq(a: i32, b: i32) -> Sequence {
        let lit = |v| Arc::new(Operation::literal(Type::int(), Value::Int(v)).unwrap());
        let add = Arc::new(Operation::static_method(
            Type::reference("Math"),
            "add",
            vec![Type::int(), Type::int()],
            Type::int(),
        ));
        Sequence::literal(lit(a))
            .unwrap()
            .extend(lit(b), vec![])
            .unwrap()
            .extend(add, vec![0, 1])
            .unwrap()
    }

    #[test]
    fn test_off_admits_everything() {
        let mut t = DuplicateTracker::new(DuplicatePolicy::Off);
        assert!(t.admit(&add_seq(1, 2)));
        assert!(t.admit(&add_seq(1, 2)));
    }

    #[test]
    fn test_structural_ignores_literal_values() {
        let mut t = DuplicateTracker::new(DuplicatePolicy::Structural);
        assert!(t.admit(&add_seq(1, 2)));
        assert!(!t.admit(&add_seq(3, 4)));
    }

    #[test]
    fn test_suffix_policy() {
        let mut t = DuplicateTracker::new(DuplicatePolicy::Suffix { length: 1 });
        assert!(t.admit(&add_seq(1, 2)));
        // same last statement and wiring
        assert!(!t.admit(&add_seq(5, 6)));
        assert!(DuplicatePolicy::Suffix { length: 0 }.validate().is_err());
    }
}
