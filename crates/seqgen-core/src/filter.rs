//! Output-selection predicates over classified sequences.

use std::collections::{BTreeSet, HashSet};

use regex::Regex;

use crate::execution::ExecutableSequence;
use crate::sequence::Sequence;

/// Decides whether a classified sequence is emitted.
pub trait TestPredicate: Send + Sync {
    fn test(&self, seq: &ExecutableSequence) -> bool;
}

impl TestPredicate for Box<dyn TestPredicate> {
    fn test(&self, seq: &ExecutableSequence) -> bool {
        (**self).test(seq)
    }
}

/// Combinators available on every predicate.
pub trait TestPredicateExt: TestPredicate + Sized {
    fn and<P: TestPredicate>(self, other: P) -> And<Self, P> {
        And(self, other)
    }

    fn or<P: TestPredicate>(self, other: P) -> Or<Self, P> {
        Or(self, other)
    }

    fn not(self) -> Not<Self> {
        Not(self)
    }
}

impl<T: TestPredicate> TestPredicateExt for T {}

#[derive(Debug, Clone)]
pub struct And<A, B>(pub A, pub B);

impl<A: TestPredicate, B: TestPredicate> TestPredicate for And<A, B> {
    fn test(&self, seq: &ExecutableSequence) -> bool {
        self.0.test(seq) && self.1.test(seq)
    }
}

#[derive(Debug, Clone)]
pub struct Or<A, B>(pub A, pub B);

impl<A: TestPredicate, B: TestPredicate> TestPredicate for Or<A, B> {
    fn test(&self, seq: &ExecutableSequence) -> bool {
        self.0.test(seq) || self.1.test(seq)
    }
}

#[derive(Debug, Clone)]
pub struct Not<A>(pub A);

impl<A: TestPredicate> TestPredicate for Not<A> {
    fn test(&self, seq: &ExecutableSequence) -> bool {
        !self.0.test(seq)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysTrue;

impl TestPredicate for AlwaysTrue {
    fn test(&self, _seq: &ExecutableSequence) -> bool {
        true
    }
}

/// Rejects sequences structurally equal to a member of the set.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSequences {
    excluded: HashSet<Sequence>,
}

impl ExcludeSequences {
    pub fn new(excluded: impl IntoIterator<Item = Sequence>) -> Self {
        Self {
            excluded: excluded.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, seq: Sequence) {
        self.excluded.insert(seq);
    }
}

impl TestPredicate for ExcludeSequences {
    fn test(&self, seq: &ExecutableSequence) -> bool {
        !self.excluded.contains(seq.sequence())
    }
}

/// Keeps sequences that mention a type whose name matches the pattern.
#[derive(Debug, Clone)]
pub struct IncludeIfTypeNameMatches {
    pattern: Regex,
}

impl IncludeIfTypeNameMatches {
    pub fn new(pattern: Regex) -> Self {
        Self { pattern }
    }
}

impl TestPredicate for IncludeIfTypeNameMatches {
    fn test(&self, seq: &ExecutableSequence) -> bool {
        seq.sequence().uses_type_matching(&self.pattern)
    }
}

/// Keeps sequences whose execution passed through at least one of the
/// designated types, as recorded by a coverage visitor.
#[derive(Debug, Clone)]
pub struct IncludeIfCovers {
    types: BTreeSet<String>,
}

impl IncludeIfCovers {
    pub fn new(types: impl IntoIterator<Item = String>) -> Self {
        Self {
            types: types.into_iter().collect(),
        }
    }
}

impl TestPredicate for IncludeIfCovers {
    fn test(&self, seq: &ExecutableSequence) -> bool {
        self.types.iter().any(|t| seq.covers_type(t))
    }
}

/// Holds for sequences fit for the regression suite.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegressionTestPredicate;

impl TestPredicate for RegressionTestPredicate {
    fn test(&self, seq: &ExecutableSequence) -> bool {
        let checks = seq.checks();
        !checks.has_error_behavior() && !checks.has_invalid_behavior()
    }
}

/// Holds for sequences that reveal an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTestPredicate;

impl TestPredicate for ErrorTestPredicate {
    fn test(&self, seq: &ExecutableSequence) -> bool {
        seq.checks().has_error_behavior()
    }
}
