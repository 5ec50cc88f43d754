//! End-to-end generation scenarios.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{assert_pool_sound, bounded_config, c_and_m_catalog, scripted, MBehavior};
use seqgen::classify::{ExceptionCheckKind, FnContract};
use seqgen::demo::{self, DemoExecutor};
use seqgen::execution::{CoverageVisitor, SharedCoverage};
use seqgen::filter::IncludeIfCovers;
use seqgen::{
    BehaviorType, ComponentPool, ContractSet, Decision, DuplicatePolicy, ExecutableSequence,
    ExecutionMode, Fault, ForwardGenerator, Operation, Outcome, Sequence, StopReason, Type,
    TypeHierarchy, Value,
};

fn calls(test: &ExecutableSequence, name: &str) -> bool {
    test.sequence()
        .statements()
        .iter()
        .any(|s| s.operation().name() == name)
}

#[test]
fn test_constructor_then_method_is_a_regression() {
    let mut config = bounded_config(1, 2_000);
    config.limits.output_limit = Some(5);
    config.behavior.unchecked = BehaviorType::Error;

    let mut gen = ForwardGenerator::new(c_and_m_catalog(), scripted(MBehavior::ThrowsOnNull), config)
        .unwrap();
    let report = gen.explore().unwrap();

    assert_eq!(report.stop_reason, StopReason::OutputLimit);
    assert_eq!(gen.regression_tests().len(), 5);
    assert!(gen.error_tests().is_empty());

    let built = "var0 = cons:T() :\nvar1 = static:Util.m(T)->int : var0\n";
    let expected: Sequence = built.parse().unwrap();
    let found = gen
        .regression_tests()
        .iter()
        .chain(gen.pool().sequences().iter())
        .any(|t| t.sequence() == &expected);
    assert!(found, "C(); m(t) was never built");
}

#[test]
fn test_always_throwing_method_lands_in_error_suite() {
    let mut config = bounded_config(2, 300);
    config.behavior.unchecked = BehaviorType::Error;

    let mut gen = ForwardGenerator::new(c_and_m_catalog(), scripted(MBehavior::AlwaysThrows), config)
        .unwrap();
    gen.explore().unwrap();

    assert!(!gen.error_tests().is_empty());
    for test in gen.error_tests() {
        let m_index = test.len() - 1;
        assert_eq!(test.sequence().statements()[m_index].operation().name(), "m");
        let checks = test.checks();
        let exception = checks.exception.as_ref().unwrap();
        assert_eq!(exception.kind, ExceptionCheckKind::Error);
        assert_eq!(exception.index, m_index);
        assert!(checks.regression.is_empty());
        assert_eq!(checks.count(), 1);
    }
    for test in gen.regression_tests() {
        assert!(!calls(test, "m"));
    }
    // nothing that calls m may feed later candidates
    for seq in gen.pool().sequences() {
        assert!(!calls(&seq, "m"));
    }
}

#[test]
fn test_subtype_closure_direction() {
    let hierarchy = Arc::new(TypeHierarchy::new().with_subtype("Dog", "Animal"));
    let mut pool = ComponentPool::new(hierarchy);
    let animal = Sequence::literal(Arc::new(Operation::constructor(
        Type::reference("Animal"),
        vec![],
    )))
    .unwrap();
    pool.put(Arc::new(ExecutableSequence::with_prefix(
        animal,
        vec![Outcome::normal(Value::object("Animal", 1))],
    )));

    assert!(pool.get(&Type::reference("Dog"), true).is_empty());
    assert!(pool.get(&Type::reference("Dog"), false).is_empty());
    assert_eq!(pool.get(&Type::reference("Animal"), false).len(), 1);
    assert_eq!(pool.get(&Type::object(), false).len(), 1);
}

#[test]
fn test_same_seed_same_decisions() {
    let run = |seed| {
        let mut config = bounded_config(seed, 150);
        config.record_decisions = true;
        let mut gen = ForwardGenerator::new(
            c_and_m_catalog(),
            scripted(MBehavior::ThrowsOnNull),
            config,
        )
        .unwrap();
        let report = gen.explore().unwrap();
        let fingerprints: Vec<String> = report
            .regression_tests
            .iter()
            .map(|t| t.fingerprint.clone())
            .collect();
        (gen.decisions().to_vec(), fingerprints)
    };
    let (decisions, tests) = run(42);
    assert!(!decisions.is_empty());
    assert_eq!(run(42), (decisions.clone(), tests));
    assert_ne!(run(43).0, decisions);
}

#[test]
fn test_invalid_candidates_never_escape() {
    let catalog = vec![
        Operation::constructor(Type::reference("Buffer"), vec![]),
        Operation::instance_method(Type::reference("Buffer"), "grow", vec![Type::int()], Type::Void),
        Operation::instance_method(Type::reference("Buffer"), "len", vec![], Type::int()),
    ];
    let executor = |op: &Operation, _: &[Value], _: Duration| -> Result<Value, Fault> {
        match op.name() {
            "<init>" => Ok(Value::object("Buffer", 7)),
            "grow" => Err(Fault::resource_exhaustion("heap exhausted")),
            _ => Ok(Value::Int(0)),
        }
    };
    let mut gen = ForwardGenerator::new(catalog, Arc::new(executor), bounded_config(5, 200)).unwrap();
    let report = gen.explore().unwrap();

    assert!(report.stats.discarded_invalid > 0);
    for test in gen.regression_tests().iter().chain(gen.error_tests()) {
        assert!(!calls(test, "grow"));
    }
    for seq in gen.pool().sequences() {
        assert!(!calls(&seq, "grow"));
    }
}

#[test]
fn test_every_candidate_gets_exactly_one_disposition() {
    let mut config = bounded_config(9, 400);
    config.execution.statement_timeout_ms = 40;
    let mut gen = ForwardGenerator::new(demo::catalog(), Arc::new(DemoExecutor::new()), config)
        .unwrap()
        .with_hierarchy(demo::hierarchy());
    let report = gen.explore().unwrap();
    let s = &report.stats;

    assert_eq!(
        s.executed,
        s.regression_classified
            + s.error_classified
            + s.discarded_invalid
            + s.discarded_nonterminating
            + s.discarded_not_executed
    );
    assert_eq!(
        s.attempts,
        s.executed + s.input_failures + s.duplicates_skipped + s.too_long
    );
    assert_eq!(
        s.regression_classified + s.error_classified,
        s.regression_emitted + s.error_emitted + s.filtered_out
    );

    let regression: HashSet<_> = report.regression_tests.iter().map(|t| &t.fingerprint).collect();
    assert!(report
        .error_tests
        .iter()
        .all(|t| !regression.contains(&t.fingerprint)));
    assert_pool_sound(&gen);
}

#[test]
fn test_demo_reveals_errors() {
    let mut config = bounded_config(3, 1_500);
    config.execution.statement_timeout_ms = 40;
    let mut gen = ForwardGenerator::new(demo::catalog(), Arc::new(DemoExecutor::new()), config)
        .unwrap()
        .with_hierarchy(demo::hierarchy());
    let report = gen.explore().unwrap();

    assert!(report.stats.error_emitted > 0);
    assert!(report.stats.regression_emitted > 0);
    for test in gen.error_tests() {
        assert!(test.checks().has_error_behavior());
    }
}

#[test]
fn test_output_switches() {
    let mut config = bounded_config(4, 200);
    config.behavior.unchecked = BehaviorType::Error;
    config.output.output_tests = false;
    let mut gen = ForwardGenerator::new(c_and_m_catalog(), scripted(MBehavior::AlwaysThrows), config.clone())
        .unwrap();
    let report = gen.explore().unwrap();
    assert_eq!(report.stats.emitted(), 0);
    assert!(report.stats.filtered_out > 0);
    assert!(!gen.pool().sequences().is_empty());

    config.output.output_tests = true;
    config.output.regression_tests = false;
    let mut gen = ForwardGenerator::new(c_and_m_catalog(), scripted(MBehavior::AlwaysThrows), config)
        .unwrap();
    gen.explore().unwrap();
    assert!(gen.regression_tests().is_empty());
    assert!(!gen.error_tests().is_empty());
}

#[test]
fn test_isolated_mode_abandons_hung_statements() {
    let catalog = vec![
        Operation::static_method(Type::reference("Clock"), "hang", vec![Type::int()], Type::int()),
    ];
    let executor = |_: &Operation, args: &[Value], _: Duration| -> Result<Value, Fault> {
        std::thread::sleep(Duration::from_secs(2));
        Ok(args[0].clone())
    };
    let mut config = bounded_config(6, 3);
    config.execution.mode = ExecutionMode::Isolated;
    config.execution.statement_timeout_ms = 50;

    let start = Instant::now();
    let mut gen = ForwardGenerator::new(catalog, Arc::new(executor), config).unwrap();
    let report = gen.explore().unwrap();

    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(report.stats.discarded_nonterminating, report.stats.executed);
    assert!(report.stats.executed > 0);
    assert_eq!(report.stats.emitted(), 0);
}

#[test]
fn test_stopper_ends_the_run() {
    let config = bounded_config(8, 10_000);
    let mut gen = ForwardGenerator::new(c_and_m_catalog(), scripted(MBehavior::ThrowsOnNull), config)
        .unwrap()
        .with_stopper(|stats| stats.attempts >= 25);
    let report = gen.explore().unwrap();
    assert_eq!(report.stop_reason, StopReason::Stopper);
    assert_eq!(report.stats.attempts, 25);
}

#[test]
fn test_time_limit_ends_the_run() {
    let mut config = bounded_config(10, 0);
    config.limits.input_limit = None;
    config.limits.time_limit_ms = Some(30);
    let start = Instant::now();
    let mut gen = ForwardGenerator::new(c_and_m_catalog(), scripted(MBehavior::ThrowsOnNull), config)
        .unwrap();
    let report = gen.explore().unwrap();
    assert_eq!(report.stop_reason, StopReason::TimeLimit);
    assert!(report.stats.attempts > 0);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_limits_are_checked_time_then_input_then_output() {
    let run = |time: Option<u64>, input: Option<u64>, output: Option<u64>| {
        let mut config = bounded_config(11, 0);
        config.limits.time_limit_ms = time;
        config.limits.input_limit = input;
        config.limits.output_limit = output;
        let mut gen =
            ForwardGenerator::new(c_and_m_catalog(), scripted(MBehavior::ThrowsOnNull), config)
                .unwrap();
        gen.explore().unwrap()
    };

    let report = run(Some(0), Some(0), Some(0));
    assert_eq!(report.stop_reason, StopReason::TimeLimit);
    let report = run(None, Some(0), Some(0));
    assert_eq!(report.stop_reason, StopReason::InputLimit);
    assert_eq!(report.stats.attempts, 0);
    let report = run(None, None, Some(0));
    assert_eq!(report.stop_reason, StopReason::OutputLimit);
}

#[test]
fn test_stop_on_first_error_test() {
    let mut config = bounded_config(12, 1_000);
    config.behavior.unchecked = BehaviorType::Error;
    config.stop_on_error_test = true;
    let mut gen = ForwardGenerator::new(c_and_m_catalog(), scripted(MBehavior::AlwaysThrows), config)
        .unwrap();
    let report = gen.explore().unwrap();
    assert_eq!(report.stop_reason, StopReason::ErrorTestFound);
    assert_eq!(report.stats.error_emitted, 1);
    assert!(report.stats.attempts < 1_000);
}

#[test]
fn test_duplicate_policies_limit_pool_growth() {
    let catalog = || vec![Operation::constructor(Type::reference("Box"), vec![Type::int()])];
    let executor = |_: &Operation, args: &[Value], _: Duration| -> Result<Value, Fault> {
        match args[0] {
            Value::Int(n) => Ok(Value::object("Box", u64::from(n.unsigned_abs()))),
            _ => Err(Fault::failure("ArgumentMismatch", "expected int")),
        }
    };
    let run = |policy: DuplicatePolicy| {
        let mut config = bounded_config(13, 60);
        config.duplicates = policy;
        let mut gen = ForwardGenerator::new(catalog(), Arc::new(executor), config).unwrap();
        gen.explore().unwrap().stats
    };

    let off = run(DuplicatePolicy::Off);
    assert_eq!(off.pool_duplicates, 0);
    assert_eq!(off.pool_additions, off.regression_classified);

    // Box(int) over different seed ints differs only in the literal value
    for policy in [DuplicatePolicy::Structural, DuplicatePolicy::Suffix { length: 1 }] {
        let stats = run(policy);
        assert!(stats.pool_duplicates > 0);
        assert_eq!(
            stats.pool_additions + stats.pool_duplicates,
            stats.regression_classified
        );
    }
}

#[test]
fn test_zero_weight_operation_is_never_chosen() {
    let mut config = bounded_config(14, 200);
    config.record_decisions = true;
    config.operation_weights.insert("cons:T()".into(), 1.0);
    config.operation_weights.insert("static:Util.m(T)->int".into(), 0.0);
    let mut gen = ForwardGenerator::new(c_and_m_catalog(), scripted(MBehavior::ThrowsOnNull), config)
        .unwrap();
    gen.explore().unwrap();

    assert!(gen.decisions().iter().all(|d| !matches!(
        d,
        Decision::Operation { operation } if operation.starts_with("static:Util.m")
    )));
    assert!(gen.regression_tests().iter().all(|t| !calls(t, "m")));
}

#[test]
fn test_custom_contract_sends_normal_runs_to_error_suite() {
    let mut config = bounded_config(15, 300);
    config.forbid_null = true;
    let contracts = ContractSet::with_defaults()
        .with(FnContract::new("never-one", |v: &Value| *v != Value::Int(1)));
    let mut gen = ForwardGenerator::new(c_and_m_catalog(), scripted(MBehavior::ThrowsOnNull), config)
        .unwrap()
        .with_contracts(contracts);
    gen.explore().unwrap();

    assert!(!gen.error_tests().is_empty());
    for test in gen.error_tests() {
        assert!(test.is_normal_execution());
        assert_eq!(test.checks().violations[0].contract, "never-one");
        assert!(calls(test, "m"));
    }
    for test in gen.regression_tests() {
        assert!(!calls(test, "m"));
    }
}

#[test]
fn test_coverage_filter_keeps_tests_covering_through_reused_prefix() {
    let coverage = SharedCoverage::new();
    let sink = coverage.clone();
    let executor = move |op: &Operation, _: &[Value], _: Duration| -> Result<Value, Fault> {
        match op.name() {
            "<init>" => {
                sink.record("T");
                Ok(Value::object("T", 1))
            }
            _ => {
                sink.record("Util");
                Ok(Value::Int(1))
            }
        }
    };
    let mut config = bounded_config(16, 500);
    config.forbid_null = true;
    let mut gen = ForwardGenerator::new(c_and_m_catalog(), Arc::new(executor), config)
        .unwrap()
        .with_visitor(CoverageVisitor::designated(coverage, ["T".to_string()]))
        .with_output_filter(IncludeIfCovers::new(["T".to_string()]));
    gen.explore().unwrap();

    assert!(gen.regression_tests().iter().any(|t| calls(t, "m")));
    for test in gen.regression_tests() {
        assert!(test.covers_type("T"));
        assert!(!test.covers_type("Util"));
    }
}
