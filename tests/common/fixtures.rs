//! Catalog and executor fixtures.

use std::sync::Arc;
use std::time::Duration;

use seqgen::{Executor, Fault, GeneratorConfig, Limits, Operation, Type, Value};

pub fn t_type() -> Type {
    Type::reference("T")
}

/// How the fixture operation `m(T) -> int` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MBehavior {
    /// Null dereference on a null argument, `1` otherwise.
    ThrowsOnNull,
    /// Unchecked fault on every call.
    AlwaysThrows,
}

/// `C() -> T` and the static `Util.m(T) -> int`.
pub fn c_and_m_catalog() -> Vec<Operation> {
    vec![
        Operation::constructor(t_type(), vec![]),
        Operation::static_method(Type::reference("Util"), "m", vec![t_type()], Type::int()),
    ]
}

/// Executor for [`c_and_m_catalog`].
pub fn scripted(m: MBehavior) -> Arc<dyn Executor> {
    Arc::new(
        move |op: &Operation, args: &[Value], _: Duration| -> Result<Value, Fault> {
            match (op.name(), m) {
                ("<init>", _) => Ok(Value::object("T", 1)),
                ("m", MBehavior::AlwaysThrows) => {
                    Err(Fault::unchecked("IllegalStateException", "m always fails"))
                }
                ("m", MBehavior::ThrowsOnNull) => match args.first() {
                    Some(Value::Null) => Err(Fault::null_dereference("m(null)")),
                    _ => Ok(Value::Int(1)),
                },
                _ => Err(Fault::failure("NoSuchMethodError", op.id())),
            }
        },
    )
}

/// Deterministic config bounded only by attempts.
pub fn bounded_config(seed: u64, attempts: u64) -> GeneratorConfig {
    GeneratorConfig {
        seed,
        limits: Limits {
            time_limit_ms: None,
            input_limit: Some(attempts),
            ..Limits::default()
        },
        ..GeneratorConfig::default()
    }
}
