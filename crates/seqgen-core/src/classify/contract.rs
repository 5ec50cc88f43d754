//! Contracts checked against values produced by normal executions.

use std::fmt;
use std::sync::Arc;

use seqgen_types::Value;

/// A property every value of interest must satisfy.
pub trait Contract: Send + Sync {
    fn name(&self) -> &str;

    /// `true` if the contract holds (or does not apply) for `value`.
    fn holds(&self, value: &Value) -> bool;
}

/// A value must equal itself. Violated by NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualsReflexive;

impl Contract for EqualsReflexive {
    fn name(&self) -> &str {
        "equals-reflexive"
    }

    #[allow(clippy::eq_op)]
    fn holds(&self, value: &Value) -> bool {
        value == value
    }
}

/// Contract backed by a closure.
pub struct FnContract<F> {
    name: String,
    check: F,
}

impl<F> FnContract<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> Contract for FnContract<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn holds(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

/// Ordered set of contracts.
#[derive(Clone, Default)]
pub struct ContractSet {
    contracts: Vec<Arc<dyn Contract>>,
}

impl ContractSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in contracts.
    pub fn with_defaults() -> Self {
        Self::new().with(EqualsReflexive)
    }

    pub fn with(mut self, contract: impl Contract + 'static) -> Self {
        self.contracts.push(Arc::new(contract));
        self
    }

    pub fn push(&mut self, contract: Arc<dyn Contract>) {
        self.contracts.push(contract);
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Name of the first contract `value` violates.
    pub fn first_violation(&self, value: &Value) -> Option<&str> {
        self.contracts
            .iter()
            .find(|c| !c.holds(value))
            .map(|c| c.name())
    }
}

impl fmt::Debug for ContractSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.contracts.iter().map(|c| c.name()))
            .finish()
    }
}
