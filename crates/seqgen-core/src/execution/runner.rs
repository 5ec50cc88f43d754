//! Statement execution through an external executor.
//!
//! Inline mode runs the executor on the generator's thread and can only
//! detect a budget overrun after the call returns. Isolated mode runs each
//! statement on a fresh worker thread and abandons the worker when the
//! budget expires; an abandoned worker is never joined and whatever it
//! eventually produces is dropped. An isolated wait never outlasts the run
//! deadline, if one is set.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use seqgen_types::{Operation, Value};

use super::outcome::{Fault, Outcome};

/// Capability that invokes the target. Implementations report target faults
/// as `Err(Fault)`; they must not be relied on to honor `budget`.
pub trait Executor: Send + Sync {
    fn execute(&self, operation: &Operation, args: &[Value], budget: Duration)
        -> Result<Value, Fault>;
}

impl<F> Executor for F
where
    F: Fn(&Operation, &[Value], Duration) -> Result<Value, Fault> + Send + Sync,
{
    fn execute(
        &self,
        operation: &Operation,
        args: &[Value],
        budget: Duration,
    ) -> Result<Value, Fault> {
        self(operation, args, budget)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Inline,
    Isolated,
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inline" => Ok(ExecutionMode::Inline),
            "isolated" => Ok(ExecutionMode::Isolated),
            other => Err(format!("unknown execution mode '{other}' (expected inline or isolated)")),
        }
    }
}

/// Runs single statements under a time budget.
#[derive(Clone)]
pub struct StatementRunner {
    executor: Arc<dyn Executor>,
    mode: ExecutionMode,
    timeout: Duration,
    deadline: Option<Instant>,
}

impl StatementRunner {
    pub fn new(executor: Arc<dyn Executor>, mode: ExecutionMode, timeout: Duration) -> Self {
        Self {
            executor,
            mode,
            timeout,
            deadline: None,
        }
    }

    /// Cap isolated waits at `deadline`.
    pub fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    /// Per-statement budget, shortened to what is left before the deadline.
    pub fn effective_timeout(&self) -> Duration {
        match self.deadline {
            Some(deadline) => self
                .timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.timeout,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute one statement. Literal operations evaluate to their value
    /// without calling the executor.
    pub fn run(&self, operation: &Arc<Operation>, args: Vec<Value>) -> Outcome {
        if let Some(value) = operation.literal_value() {
            return Outcome::normal(value.clone());
        }
        trace!(operation = %operation, args = args.len(), mode = ?self.mode, "executing statement");
        match self.mode {
            ExecutionMode::Inline => self.run_inline(operation, &args),
            ExecutionMode::Isolated => self.run_isolated(operation, args),
        }
    }

    fn run_inline(&self, operation: &Operation, args: &[Value]) -> Outcome {
        let start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| {
            self.executor.execute(operation, args, self.timeout)
        }));
        let elapsed = start.elapsed();
        if elapsed > self.timeout {
            return Outcome::NonTerminating {
                budget: self.timeout,
            };
        }
        to_outcome(result.map_err(panic_message), elapsed)
    }

    fn run_isolated(&self, operation: &Arc<Operation>, args: Vec<Value>) -> Outcome {
        let (tx, rx) = mpsc::channel();
        let executor = Arc::clone(&self.executor);
        let op = Arc::clone(operation);
        let budget = self.effective_timeout();
        let start = Instant::now();

        let spawned = thread::Builder::new()
            .name("seqgen-exec".to_string())
            .spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| executor.execute(&op, &args, budget)))
                    .map_err(panic_message);
                // receiver is gone if the worker was abandoned
                let _ = tx.send(result);
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn execution worker");
            return Outcome::Exceptional {
                fault: Fault::resource_exhaustion(format!("cannot spawn worker: {e}")),
                elapsed: start.elapsed(),
            };
        }

        match rx.recv_timeout(budget) {
            Ok(result) => to_outcome(result, start.elapsed()),
            Err(RecvTimeoutError::Timeout) => {
                warn!(operation = %operation, budget_ms = budget.as_millis() as u64, "statement exceeded its budget; abandoning worker");
                Outcome::NonTerminating { budget }
            }
            Err(RecvTimeoutError::Disconnected) => Outcome::Exceptional {
                fault: Fault::failure("WorkerDied", "execution worker exited without a result"),
                elapsed: start.elapsed(),
            },
        }
    }
}

fn to_outcome(result: Result<Result<Value, Fault>, String>, elapsed: Duration) -> Outcome {
    match result {
        Ok(Ok(value)) => Outcome::Normal { value, elapsed },
        Ok(Err(fault)) => Outcome::Exceptional { fault, elapsed },
        Err(message) => Outcome::Exceptional {
            fault: Fault::failure("Panic", message),
            elapsed,
        },
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "executor panicked".to_string()
    }
}
