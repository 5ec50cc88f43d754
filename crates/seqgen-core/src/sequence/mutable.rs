//! Arena-based editable sequence.
//!
//! Statements are addressed by index and values by stable [`VarId`]s, so an
//! insertion never renumbers existing variables. Edits stay local to a
//! `MutableSequence`; [`MutableSequence::to_sequence`] exports an immutable
//! [`Sequence`].

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use seqgen_types::{Operation, TypeHierarchy};

use super::{Sequence, Statement};
use crate::errors::SequenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u32);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct MutableStatement {
    pub var: VarId,
    pub operation: Arc<Operation>,
    pub inputs: Vec<VarId>,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MutableSequence {
    statements: Vec<MutableStatement>,
    next_var: u32,
}

impl MutableSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sequence(seq: &Sequence) -> Self {
        let mut out = Self::new();
        out.splice(seq);
        out
    }

    /// Append all statements of `seq`, returning the variable that now holds
    /// each of its positions.
    pub fn splice(&mut self, seq: &Sequence) -> Vec<VarId> {
        let mut vars = Vec::with_capacity(seq.len());
        for (i, stmt) in seq.statements().iter().enumerate() {
            let var = self.fresh_var();
            self.statements.push(MutableStatement {
                var,
                operation: stmt.operation().clone(),
                inputs: stmt.inputs().iter().map(|&j| vars[j]).collect(),
                active: seq.is_active(i),
            });
            vars.push(var);
        }
        vars
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> &[MutableStatement] {
        &self.statements
    }

    pub fn variable(&self, index: usize) -> Option<VarId> {
        self.statements.get(index).map(|s| s.var)
    }

    pub fn index_of(&self, var: VarId) -> Option<usize> {
        self.statements.iter().position(|s| s.var == var)
    }

    /// Append a statement; its output is active unless void.
    pub fn push(
        &mut self,
        operation: Arc<Operation>,
        inputs: Vec<VarId>,
    ) -> Result<VarId, SequenceError> {
        let len = self.statements.len();
        self.insert(len, operation, inputs)
    }

    /// Insert a statement at `index`. Every input must be defined before
    /// `index`.
    pub fn insert(
        &mut self,
        index: usize,
        operation: Arc<Operation>,
        inputs: Vec<VarId>,
    ) -> Result<VarId, SequenceError> {
        if index > self.statements.len() {
            return Err(SequenceError::IndexOutOfBounds {
                index,
                len: self.statements.len(),
            });
        }
        if operation.arity() != inputs.len() {
            return Err(SequenceError::ArityMismatch {
                operation: operation.id().to_string(),
                expected: operation.arity(),
                actual: inputs.len(),
            });
        }
        for input in &inputs {
            match self.index_of(*input) {
                Some(def) if def < index => {}
                Some(def) => {
                    return Err(SequenceError::ForwardReference {
                        statement: index,
                        input: def,
                    })
                }
                None => return Err(SequenceError::UnknownVariable(input.to_string())),
            }
        }
        let var = self.fresh_var();
        let active = !operation.output_type().is_void();
        self.statements.insert(
            index,
            MutableStatement {
                var,
                operation,
                inputs,
                active,
            },
        );
        Ok(var)
    }

    /// Indices of statements that take `var` as an input.
    pub fn uses(&self, var: VarId) -> Vec<usize> {
        self.statements
            .iter()
            .enumerate()
            .filter(|(_, s)| s.inputs.contains(&var))
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of non-literal statements that may influence the value of
    /// `var`: its producer, the producers of its inputs (transitively), and
    /// any earlier statement that takes one of those values as an input.
    pub fn num_influencing_statements(&self, var: VarId) -> Result<usize, SequenceError> {
        let target = self
            .index_of(var)
            .ok_or_else(|| SequenceError::UnknownVariable(var.to_string()))?;
        let mut seen: HashSet<VarId> = HashSet::from([var]);
        let mut worklist = vec![var];
        let mut influencing: BTreeSet<usize> = BTreeSet::new();

        while let Some(current) = worklist.pop() {
            let Some(def) = self.index_of(current) else {
                continue;
            };
            let mut touched = vec![def];
            touched.extend(self.uses(current).into_iter().filter(|&i| i <= target));
            for index in touched {
                let stmt = &self.statements[index];
                if stmt.operation.is_literal() || !influencing.insert(index) {
                    continue;
                }
                for &input in &stmt.inputs {
                    if seen.insert(input) {
                        worklist.push(input);
                    }
                }
            }
        }
        Ok(influencing.len())
    }

    /// Internal consistency: unique variables, backward references and
    /// declared assignability.
    pub fn check_rep(&self, hierarchy: &TypeHierarchy) -> Result<(), SequenceError> {
        let mut positions: HashMap<VarId, usize> = HashMap::new();
        for (index, stmt) in self.statements.iter().enumerate() {
            if positions.insert(stmt.var, index).is_some() {
                return Err(SequenceError::Parse {
                    line: index,
                    reason: format!("variable {} defined twice", stmt.var),
                });
            }
        }
        self.to_sequence()?.check_well_formed(hierarchy)
    }

    /// Export an immutable sequence, preserving active flags.
    pub fn to_sequence(&self) -> Result<Sequence, SequenceError> {
        let positions: HashMap<VarId, usize> = self
            .statements
            .iter()
            .enumerate()
            .map(|(i, s)| (s.var, i))
            .collect();
        let mut statements = Vec::with_capacity(self.statements.len());
        let mut active = Vec::with_capacity(self.statements.len());
        for (index, stmt) in self.statements.iter().enumerate() {
            let inputs = stmt
                .inputs
                .iter()
                .map(|v| {
                    let pos = positions
                        .get(v)
                        .copied()
                        .ok_or_else(|| SequenceError::UnknownVariable(v.to_string()))?;
                    if pos >= index {
                        return Err(SequenceError::ForwardReference {
                            statement: index,
                            input: pos,
                        });
                    }
                    Ok(pos)
                })
                .collect::<Result<Vec<_>, _>>()?;
            statements.push(Statement::new(stmt.operation.clone(), inputs)?);
            active.push(stmt.active && !stmt.operation.output_type().is_void());
        }
        Ok(Sequence::from_parts(statements, active))
    }

    fn fresh_var(&mut self) -> VarId {
        let var = VarId(self.next_var);
        self.next_var += 1;
        var
    }
}
