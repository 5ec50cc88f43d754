//! Turning an executed candidate into a disposition plus checks.

use serde::{Deserialize, Serialize};

use super::behavior::{classify_fault, BehaviorPolicy, BehaviorType};
use super::checks::{
    ContractViolation, ExceptionCheck, ExceptionCheckKind, RegressionCheck, TestChecks,
};
use super::contract::ContractSet;
use crate::execution::executable::ExecutableSequence;
use crate::execution::outcome::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    NonTerminating,
    InvalidBehavior,
    /// The candidate was never run to completion or to a fault.
    NotExecuted,
}

/// Final disposition of a candidate. Exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "disposition", content = "reason", rename_all = "snake_case")]
pub enum Disposition {
    Regression,
    Error,
    Discarded(DiscardReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub disposition: Disposition,
    pub checks: TestChecks,
}

impl Classification {
    fn discarded(reason: DiscardReason) -> Self {
        Self {
            disposition: Disposition::Discarded(reason),
            checks: TestChecks::default(),
        }
    }
}

pub trait CheckGenerator: Send + Sync {
    fn generate(&self, seq: &ExecutableSequence) -> Classification;
}

/// Policy-driven classifier.
///
/// - non-termination discards the candidate
/// - a fault is looked up in the [`BehaviorPolicy`]: invalid discards, error
///   keeps only the error check, expected keeps regression checks for the
///   statements before the fault plus an expected-fault check
/// - a normal run is checked against the contracts on the values touched by
///   its last statement, then gets one regression check per statement
#[derive(Debug, Clone)]
pub struct OutcomeClassifier {
    policy: BehaviorPolicy,
    contracts: ContractSet,
    no_regression_assertions: bool,
}

impl OutcomeClassifier {
    pub fn new(policy: BehaviorPolicy, contracts: ContractSet, no_regression_assertions: bool) -> Self {
        Self {
            policy,
            contracts,
            no_regression_assertions,
        }
    }

    pub fn policy(&self) -> &BehaviorPolicy {
        &self.policy
    }

    fn regression_checks(&self, seq: &ExecutableSequence, upto: usize) -> Vec<RegressionCheck> {
        if self.no_regression_assertions {
            return Vec::new();
        }
        (0..upto)
            .filter_map(|i| {
                let stmt = seq.sequence().statement(i)?;
                if stmt.is_literal() || stmt.output_type().is_void() {
                    return None;
                }
                seq.value(i).map(|v| RegressionCheck::for_value(i, v))
            })
            .collect()
    }

    fn contract_violation(&self, seq: &ExecutableSequence) -> Option<ContractViolation> {
        let last = seq.len().checked_sub(1)?;
        let stmt = seq.sequence().statement(last)?;
        let mut touched: Vec<_> = seq.input_values(last).into_iter().flatten().collect();
        if !stmt.output_type().is_void() {
            touched.extend(seq.value(last));
        }
        touched.into_iter().find_map(|value| {
            self.contracts
                .first_violation(value)
                .map(|name| ContractViolation {
                    index: last,
                    contract: name.to_string(),
                })
        })
    }
}

impl CheckGenerator for OutcomeClassifier {
    fn generate(&self, seq: &ExecutableSequence) -> Classification {
        if let Some(index) = seq.fault_index() {
            let fault = match seq.outcome(index) {
                Some(Outcome::Exceptional { fault, .. }) => fault,
                _ => return Classification::discarded(DiscardReason::NonTerminating),
            };
            let null_input = seq
                .input_values(index)
                .iter()
                .any(|v| v.is_some_and(|v| v.is_null()));
            let behavior = self.policy.behavior_for(classify_fault(fault, null_input));
            let exception = |kind| ExceptionCheck {
                index,
                fault_name: fault.name.clone(),
                kind,
            };
            return match behavior {
                BehaviorType::Invalid => Classification {
                    disposition: Disposition::Discarded(DiscardReason::InvalidBehavior),
                    checks: TestChecks {
                        exception: Some(exception(ExceptionCheckKind::Invalid)),
                        ..TestChecks::default()
                    },
                },
                BehaviorType::Error => Classification {
                    disposition: Disposition::Error,
                    checks: TestChecks {
                        exception: Some(exception(ExceptionCheckKind::Error)),
                        ..TestChecks::default()
                    },
                },
                BehaviorType::Expected => {
                    let kind = if self.no_regression_assertions {
                        ExceptionCheckKind::Empty
                    } else {
                        ExceptionCheckKind::Expected
                    };
                    Classification {
                        disposition: Disposition::Regression,
                        checks: TestChecks {
                            regression: self.regression_checks(seq, index),
                            exception: Some(exception(kind)),
                            violations: Vec::new(),
                        },
                    }
                }
            };
        }

        if seq.has_non_executed_statements() {
            return Classification::discarded(DiscardReason::NotExecuted);
        }

        if let Some(violation) = self.contract_violation(seq) {
            return Classification {
                disposition: Disposition::Error,
                checks: TestChecks {
                    violations: vec![violation],
                    ..TestChecks::default()
                },
            };
        }

        Classification {
            disposition: Disposition::Regression,
            checks: TestChecks {
                regression: self.regression_checks(seq, seq.len()),
                ..TestChecks::default()
            },
        }
    }
}

/// Attaches no checks; everything that terminates is a regression test.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoChecks;

impl CheckGenerator for NoChecks {
    fn generate(&self, seq: &ExecutableSequence) -> Classification {
        match seq.fault_index().and_then(|i| seq.outcome(i)) {
            Some(Outcome::NonTerminating { .. }) => {
                Classification::discarded(DiscardReason::NonTerminating)
            }
            _ => Classification {
                disposition: Disposition::Regression,
                checks: TestChecks::default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::outcome::Fault;
    use crate::sequence::Sequence;
    use seqgen_types::{Operation, Type, Value};
    use std::sync::Arc;
    use std::time::Duration;

    fn thing() -> Type {
        Type::reference("Thing")
    }

    /// `var0 = Thing()`, `var1 = var0.size()`, `var2 = var0.ratio()`.
    fn executed(outcomes: Vec<Outcome>) -> ExecutableSequence {
        let seq = Sequence::literal(Arc::new(Operation::constructor(thing(), vec![])))
            .unwrap()
            .extend(
                Arc::new(Operation::instance_method(thing(), "size", vec![], Type::int())),
                vec![0],
            )
            .unwrap()
            .extend(
                Arc::new(Operation::instance_method(thing(), "ratio", vec![], Type::double())),
                vec![0],
            )
            .unwrap();
        ExecutableSequence::with_prefix(seq, outcomes)
    }

    fn fault(f: Fault) -> Outcome {
        Outcome::Exceptional {
            fault: f,
            elapsed: Duration::ZERO,
        }
    }

    fn classifier(policy: BehaviorPolicy, no_regression_assertions: bool) -> OutcomeClassifier {
        OutcomeClassifier::new(policy, ContractSet::with_defaults(), no_regression_assertions)
    }

    #[test]
    fn test_normal_run_gets_regression_checks() {
        let seq = executed(vec![
            Outcome::normal(Value::object("Thing", 1)),
            Outcome::normal(Value::Int(3)),
            Outcome::normal(Value::Double(0.5)),
        ]);
        let c = classifier(BehaviorPolicy::default(), false).generate(&seq);
        assert_eq!(c.disposition, Disposition::Regression);
        assert_eq!(c.checks.regression.len(), 3);
        assert!(c.checks.exception.is_none());
    }

    #[test]
    fn test_error_fault_keeps_only_the_error_check() {
        let seq = executed(vec![
            Outcome::normal(Value::object("Thing", 1)),
            fault(Fault::unchecked("IllegalStateException", "")),
            Outcome::NotExecuted,
        ]);
        let policy = BehaviorPolicy {
            unchecked: BehaviorType::Error,
            ..BehaviorPolicy::default()
        };
        let c = classifier(policy, false).generate(&seq);
        assert_eq!(c.disposition, Disposition::Error);
        assert!(c.checks.regression.is_empty());
        let exc = c.checks.exception.unwrap();
        assert_eq!((exc.index, exc.kind), (1, ExceptionCheckKind::Error));
    }

    #[test]
    fn test_expected_fault_keeps_earlier_regression_checks() {
        let seq = executed(vec![
            Outcome::normal(Value::object("Thing", 1)),
            Outcome::normal(Value::Int(3)),
            fault(Fault::checked("IOException", "")),
        ]);
        let c = classifier(BehaviorPolicy::default(), false).generate(&seq);
        assert_eq!(c.disposition, Disposition::Regression);
        assert_eq!(c.checks.regression.len(), 2);
        assert_eq!(c.checks.exception.unwrap().kind, ExceptionCheckKind::Expected);
    }

    #[test]
    fn test_no_regression_assertions_yields_empty_check() {
        let seq = executed(vec![
            Outcome::normal(Value::object("Thing", 1)),
            Outcome::normal(Value::Int(3)),
            fault(Fault::checked("IOException", "")),
        ]);
        let c = classifier(BehaviorPolicy::default(), true).generate(&seq);
        assert!(c.checks.regression.is_empty());
        assert_eq!(c.checks.exception.unwrap().kind, ExceptionCheckKind::Empty);
    }

    #[test]
    fn test_invalid_and_nonterminating_are_discarded() {
        let oom = executed(vec![
            Outcome::normal(Value::object("Thing", 1)),
            fault(Fault::resource_exhaustion("")),
            Outcome::NotExecuted,
        ]);
        let c = classifier(BehaviorPolicy::default(), false).generate(&oom);
        assert_eq!(c.disposition, Disposition::Discarded(DiscardReason::InvalidBehavior));

        let hang = executed(vec![
            Outcome::normal(Value::object("Thing", 1)),
            Outcome::NonTerminating {
                budget: Duration::from_millis(5),
            },
            Outcome::NotExecuted,
        ]);
        for gen in [
            &classifier(BehaviorPolicy::default(), false) as &dyn CheckGenerator,
            &NoChecks as &dyn CheckGenerator,
        ] {
            assert_eq!(
                gen.generate(&hang).disposition,
                Disposition::Discarded(DiscardReason::NonTerminating)
            );
        }
    }

    #[test]
    fn test_contract_violation_on_last_statement() {
        let seq = executed(vec![
            Outcome::normal(Value::object("Thing", 1)),
            Outcome::normal(Value::Int(3)),
            Outcome::normal(Value::Double(f64::NAN)),
        ]);
        let c = classifier(BehaviorPolicy::default(), false).generate(&seq);
        assert_eq!(c.disposition, Disposition::Error);
        assert_eq!(c.checks.violations[0].index, 2);
        assert!(c.checks.regression.is_empty());
    }

    #[test]
    fn test_unexecuted_candidate_is_discarded() {
        let seq = executed(vec![Outcome::normal(Value::object("Thing", 1))]);
        let c = classifier(BehaviorPolicy::default(), false).generate(&seq);
        assert_eq!(c.disposition, Disposition::Discarded(DiscardReason::NotExecuted));
    }
}
