//! Small in-process target for the `seqgen` binary and the integration tests.
//!
//! The catalog mixes ordinary operations with a few deliberate defects so a
//! short run produces both suites:
//!
//! - `Account.merge` dereferences a cleared field when an account is merged
//!   into itself (null dereference on non-null input, an error by default)
//! - `MathUtil.ratio(0, 0)` returns NaN, which violates reflexive equality
//! - `Cache.fill` exhausts memory for large sizes (invalid by default)
//! - `MathUtil.spin(100)` outlives its budget

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use seqgen_core::execution::SharedCoverage;
use seqgen_core::{Executor, Fault, Operation, Type, TypeHierarchy, Value};
use seqgen_types::ObjectRef;

fn account() -> Type {
    Type::reference("Account")
}

fn animal() -> Type {
    Type::reference("Animal")
}

fn dog() -> Type {
    Type::reference("Dog")
}

fn math() -> Type {
    Type::reference("MathUtil")
}

/// Every operation the demo target exposes.
pub fn catalog() -> Vec<Operation> {
    vec![
        Operation::constructor(account(), vec![]),
        Operation::instance_method(account(), "deposit", vec![Type::int()], Type::Void),
        Operation::instance_method(account(), "withdraw", vec![Type::int()], Type::Void),
        Operation::instance_method(account(), "balance", vec![], Type::int()),
        Operation::instance_method(account(), "transfer", vec![account(), Type::int()], Type::Void),
        Operation::instance_method(account(), "merge", vec![account()], account()),
        Operation::constructor(animal(), vec![]),
        Operation::constructor(dog(), vec![]),
        Operation::instance_method(animal(), "speak", vec![], Type::string()),
        Operation::static_method(Type::reference("Kennel"), "admit", vec![animal()], Type::int()),
        Operation::static_method(Type::reference("Text"), "shout", vec![Type::string()], Type::string()),
        Operation::static_method(math(), "ratio", vec![Type::int(), Type::int()], Type::double()),
        Operation::static_method(math(), "spin", vec![Type::int()], Type::int()),
        Operation::static_method(Type::reference("Cache"), "fill", vec![Type::int()], Type::Void),
    ]
}

pub fn hierarchy() -> TypeHierarchy {
    TypeHierarchy::new().with_subtype("Dog", "Animal")
}

#[derive(Debug, Clone)]
enum Object {
    Account { balance: i64 },
    Animal { is_dog: bool },
}

#[derive(Debug, Default)]
struct Heap {
    objects: HashMap<u64, Object>,
    next_id: u64,
    admitted: i32,
}

impl Heap {
    fn alloc(&mut self, type_name: &str, object: Object) -> Value {
        self.next_id += 1;
        self.objects.insert(self.next_id, object);
        Value::object(type_name, self.next_id)
    }

    fn balance_mut(&mut self, obj: &ObjectRef) -> Result<&mut i64, Fault> {
        match self.objects.get_mut(&obj.id) {
            Some(Object::Account { balance }) => Ok(balance),
            _ => Err(Fault::failure("ClassCastException", format!("{} is not an Account", obj.id))),
        }
    }
}

/// In-process executor over a shared object heap.
#[derive(Debug, Default)]
pub struct DemoExecutor {
    heap: Mutex<Heap>,
    coverage: Option<SharedCoverage>,
}

impl DemoExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the declaring type of every executed operation into `coverage`.
    pub fn with_coverage(coverage: SharedCoverage) -> Self {
        Self {
            heap: Mutex::default(),
            coverage: Some(coverage),
        }
    }

    fn call(&self, op: &Operation, args: &[Value], budget: Duration) -> Result<Value, Fault> {
        let decl = op.declaring_type().name();
        match (decl, op.name()) {
            ("Account", "<init>") => Ok(self.heap.lock().alloc("Account", Object::Account { balance: 0 })),
            ("Account", "deposit") => {
                let recv = receiver(args)?;
                let amount = int_arg(args, 1)?;
                if amount < 0 {
                    return Err(Fault::checked(
                        "IllegalArgumentException",
                        format!("negative deposit {amount}"),
                    ));
                }
                *self.heap.lock().balance_mut(recv)? += i64::from(amount);
                Ok(Value::Null)
            }
            ("Account", "withdraw") => {
                let recv = receiver(args)?;
                let amount = int_arg(args, 1)?;
                let mut heap = self.heap.lock();
                let balance = heap.balance_mut(recv)?;
                if i64::from(amount) > *balance {
                    return Err(Fault::unchecked(
                        "InsufficientFundsException",
                        format!("balance {balance} < {amount}"),
                    ));
                }
                *balance -= i64::from(amount);
                Ok(Value::Null)
            }
            ("Account", "balance") => {
                let recv = receiver(args)?;
                let balance = *self.heap.lock().balance_mut(recv)?;
                Ok(Value::Int(balance.clamp(i32::MIN.into(), i32::MAX.into()) as i32))
            }
            ("Account", "transfer") => {
                let recv = receiver(args)?;
                let target = object_arg(args, 1)?
                    .ok_or_else(|| Fault::null_dereference("transfer target is null"))?;
                let amount = int_arg(args, 2)?;
                let mut heap = self.heap.lock();
                let from = heap.balance_mut(recv)?;
                if i64::from(amount) > *from {
                    return Err(Fault::unchecked("InsufficientFundsException", "transfer"));
                }
                *from -= i64::from(amount);
                *heap.balance_mut(target)? += i64::from(amount);
                Ok(Value::Null)
            }
            ("Account", "merge") => {
                let recv = receiver(args)?;
                let other = object_arg(args, 1)?
                    .ok_or_else(|| Fault::null_dereference("merge source is null"))?;
                if other.id == recv.id {
                    // the source history is cleared before it is read back
                    return Err(Fault::null_dereference("history cleared during self-merge"));
                }
                let mut heap = self.heap.lock();
                let moved = std::mem::take(heap.balance_mut(other)?);
                *heap.balance_mut(recv)? += moved;
                Ok(Value::Object(recv.clone()))
            }
            ("Animal", "<init>") => Ok(self.heap.lock().alloc("Animal", Object::Animal { is_dog: false })),
            ("Dog", "<init>") => Ok(self.heap.lock().alloc("Dog", Object::Animal { is_dog: true })),
            ("Animal", "speak") => {
                let recv = receiver(args)?;
                match self.heap.lock().objects.get(&recv.id) {
                    Some(Object::Animal { is_dog: true }) => Ok(Value::Str("woof".into())),
                    Some(Object::Animal { is_dog: false }) => Ok(Value::Str("...".into())),
                    _ => Err(Fault::failure("ClassCastException", "not an Animal")),
                }
            }
            ("Kennel", "admit") => {
                object_arg(args, 0)?.ok_or_else(|| Fault::null_dereference("cannot admit null"))?;
                let mut heap = self.heap.lock();
                heap.admitted += 1;
                Ok(Value::Int(heap.admitted))
            }
            ("Text", "shout") => match args.first() {
                Some(Value::Str(s)) => Ok(Value::Str(s.to_uppercase())),
                Some(Value::Null) => Err(Fault::null_dereference("shout(null)")),
                _ => Err(argument_mismatch(0)),
            },
            ("MathUtil", "ratio") => {
                let a = int_arg(args, 0)?;
                let b = int_arg(args, 1)?;
                Ok(Value::Double(f64::from(a) / f64::from(b)))
            }
            ("MathUtil", "spin") => {
                let n = int_arg(args, 0)?;
                if n == 100 {
                    thread::sleep(budget + Duration::from_millis(20));
                }
                Ok(Value::Int(n))
            }
            ("Cache", "fill") => {
                let n = int_arg(args, 0)?;
                if n >= 100 {
                    return Err(Fault::resource_exhaustion(format!("cannot fill {n} slots")));
                }
                Ok(Value::Null)
            }
            _ => Err(Fault::failure("NoSuchMethodError", op.id())),
        }
    }
}

impl Executor for DemoExecutor {
    fn execute(&self, operation: &Operation, args: &[Value], budget: Duration) -> Result<Value, Fault> {
        let scope = self.coverage.as_ref().map(SharedCoverage::scope);
        let result = self.call(operation, args, budget);
        if let Some(scope) = scope {
            // dropped if this call outlived its sequence
            scope.record(operation.declaring_type().name());
        }
        trace!(operation = %operation, ok = result.is_ok(), "demo call");
        result
    }
}

fn argument_mismatch(index: usize) -> Fault {
    Fault::failure("ArgumentMismatch", format!("unexpected value at input {index}"))
}

fn receiver(args: &[Value]) -> Result<&ObjectRef, Fault> {
    object_arg(args, 0)?.ok_or_else(|| Fault::null_dereference("null receiver"))
}

fn object_arg(args: &[Value], index: usize) -> Result<Option<&ObjectRef>, Fault> {
    match args.get(index) {
        Some(Value::Object(obj)) => Ok(Some(obj)),
        Some(Value::Null) => Ok(None),
        _ => Err(argument_mismatch(index)),
    }
}

fn int_arg(args: &[Value], index: usize) -> Result<i32, Fault> {
    match args.get(index) {
        Some(Value::Int(n)) => Ok(*n),
        _ => Err(argument_mismatch(index)),
    }
}
