//! Forward generation loop.
//!
//! Each iteration picks an operation, resolves every input from the
//! component pool (or an injected null), splices the chosen argument
//! sequences into one candidate, executes only the new statement, classifies
//! the result and feeds normal regression candidates back into the pool.
//! Every random choice comes from a single seeded [`StdRng`].

pub mod config;
pub mod duplicates;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use seqgen_types::{Operation, Type, TypeHierarchy, Value};

use crate::classify::{
    CheckGenerator, ContractSet, DiscardReason, Disposition, OutcomeClassifier,
};
use crate::errors::{GeneratorError, SequenceError};
use crate::execution::{ExecutableSequence, ExecutionVisitor, Executor, Outcome, StatementRunner};
use crate::filter::{
    AlwaysTrue, ErrorTestPredicate, ExcludeSequences, RegressionTestPredicate, TestPredicate,
};
use crate::pool::ComponentPool;
use crate::report::{GenerationReport, GeneratorStats, StopReason, TestSummary};
use crate::seeds::default_seeds;
use crate::sequence::{MutableSequence, Sequence, VarId};

pub use config::{ExecutionConfig, GeneratorConfig, Limits, OutputConfig};
pub use duplicates::{DuplicatePolicy, DuplicateTracker};

/// Caller-supplied early stop condition, polled between iterations.
pub type StopPredicate = Box<dyn FnMut(&GeneratorStats) -> bool + Send>;

/// One random decision, in the order it was drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Operation { operation: String },
    /// `candidate` indexes the compatible pool view, `position` the chosen
    /// statement inside that sequence.
    Argument {
        input: usize,
        candidate: usize,
        position: usize,
    },
    Null { input: usize },
}

/// How one input of the chosen operation gets its value.
enum InputChoice {
    Pooled {
        seq: Arc<ExecutableSequence>,
        position: usize,
    },
    Null(Type),
}

pub struct ForwardGenerator {
    catalog: Vec<Arc<Operation>>,
    hierarchy: Arc<TypeHierarchy>,
    config: GeneratorConfig,
    runner: StatementRunner,
    rng: StdRng,
    weights: Option<WeightedIndex<f64>>,
    pool: ComponentPool,
    seeds: Vec<Sequence>,
    seeded: bool,
    check_generator: Box<dyn CheckGenerator>,
    output_filter: Box<dyn TestPredicate>,
    seed_filter: ExcludeSequences,
    visitors: Vec<Box<dyn ExecutionVisitor>>,
    stopper: Option<StopPredicate>,
    seen: HashSet<Sequence>,
    seen_literals: HashSet<String>,
    duplicates: DuplicateTracker,
    regression: Vec<Arc<ExecutableSequence>>,
    errors: Vec<Arc<ExecutableSequence>>,
    stats: GeneratorStats,
    decisions: Vec<Decision>,
}

impl ForwardGenerator {
    /// Build a generator over `catalog`. Fails on an empty catalog or an
    /// invalid configuration.
    pub fn new(
        catalog: Vec<Operation>,
        executor: Arc<dyn Executor>,
        config: GeneratorConfig,
    ) -> Result<Self, GeneratorError> {
        if catalog.is_empty() {
            return Err(GeneratorError::EmptyCatalog);
        }
        config.validate()?;
        let catalog: Vec<Arc<Operation>> = catalog.into_iter().map(Arc::new).collect();

        let weights = if config.operation_weights.is_empty() {
            None
        } else {
            let mut unknown: Vec<&str> = config
                .operation_weights
                .keys()
                .filter(|id| !catalog.iter().any(|op| op.id() == id.as_str()))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                unknown.sort_unstable();
                return Err(GeneratorError::InvalidConfig(format!(
                    "operation weights name unknown operations: {}",
                    unknown.join(", ")
                )));
            }
            let per_op = catalog.iter().map(|op| {
                config
                    .operation_weights
                    .get(op.id())
                    .copied()
                    .unwrap_or(1.0)
            });
            Some(WeightedIndex::new(per_op).map_err(|e| {
                GeneratorError::InvalidConfig(format!("operation weights: {e}"))
            })?)
        };

        let hierarchy = Arc::new(TypeHierarchy::new());
        let runner = StatementRunner::new(
            executor,
            config.execution.mode,
            config.execution.statement_timeout(),
        );
        let check_generator = Box::new(OutcomeClassifier::new(
            config.behavior,
            ContractSet::with_defaults(),
            config.no_regression_assertions,
        ));

        Ok(Self {
            catalog,
            pool: ComponentPool::new(Arc::clone(&hierarchy)),
            hierarchy,
            rng: StdRng::seed_from_u64(config.seed),
            duplicates: DuplicateTracker::new(config.duplicates),
            config,
            runner,
            weights,
            seeds: default_seeds()?,
            seeded: false,
            check_generator,
            output_filter: Box::new(AlwaysTrue),
            seed_filter: ExcludeSequences::default(),
            visitors: Vec::new(),
            stopper: None,
            seen: HashSet::new(),
            seen_literals: HashSet::new(),
            regression: Vec::new(),
            errors: Vec::new(),
            stats: GeneratorStats::default(),
            decisions: Vec::new(),
        })
    }

    /// Use a declared subtype relation. Resets the pool, so call it before
    /// [`explore`](Self::explore).
    pub fn with_hierarchy(mut self, hierarchy: TypeHierarchy) -> Self {
        self.hierarchy = Arc::new(hierarchy);
        self.pool = ComponentPool::new(Arc::clone(&self.hierarchy));
        self
    }

    /// Replace the default seed sequences.
    pub fn with_seeds(mut self, seeds: Vec<Sequence>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn with_contracts(mut self, contracts: ContractSet) -> Self {
        self.check_generator = Box::new(OutcomeClassifier::new(
            self.config.behavior,
            contracts,
            self.config.no_regression_assertions,
        ));
        self
    }

    pub fn with_check_generator(mut self, check_generator: impl CheckGenerator + 'static) -> Self {
        self.check_generator = Box::new(check_generator);
        self
    }

    pub fn with_output_filter(mut self, filter: impl TestPredicate + 'static) -> Self {
        self.output_filter = Box::new(filter);
        self
    }

    /// Visitors run in the order they are added.
    pub fn with_visitor(mut self, visitor: impl ExecutionVisitor + 'static) -> Self {
        self.visitors.push(Box::new(visitor));
        self
    }

    pub fn with_stopper(
        mut self,
        stopper: impl FnMut(&GeneratorStats) -> bool + Send + 'static,
    ) -> Self {
        self.stopper = Some(Box::new(stopper));
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Run until a limit or the stopper fires.
    pub fn explore(&mut self) -> Result<GenerationReport, GeneratorError> {
        let started_at = Utc::now();
        let start = Instant::now();
        info!(
            seed = self.config.seed,
            operations = self.catalog.len(),
            mode = ?self.runner.mode(),
            "starting generation"
        );

        if let Some(ms) = self.config.limits.time_limit_ms {
            self.runner.set_deadline(start + Duration::from_millis(ms));
        }
        self.execute_seeds()?;

        let stop_reason = loop {
            if let Some(reason) = self.stop_reason(start.elapsed()) {
                break reason;
            }
            self.step()?;
        };

        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            reason = %stop_reason,
            attempts = self.stats.attempts,
            regression = self.stats.regression_emitted,
            error = self.stats.error_emitted,
            pool_types = self.pool.types().len(),
            elapsed_ms,
            "generation finished"
        );

        Ok(GenerationReport {
            run_id: Uuid::new_v4(),
            seed: self.config.seed,
            started_at,
            finished_at: Utc::now(),
            elapsed_ms,
            stop_reason,
            stats: self.stats.clone(),
            pool_types: self.pool.types().len(),
            pool_entries: self.pool.num_entries(),
            regression_tests: self.regression.iter().map(|s| TestSummary::of(s)).collect(),
            error_tests: self.errors.iter().map(|s| TestSummary::of(s)).collect(),
        })
    }

    /// Checked in the order time, input attempts, output count.
    fn stop_reason(&mut self, elapsed: Duration) -> Option<StopReason> {
        let limits = &self.config.limits;
        if limits
            .time_limit_ms
            .is_some_and(|ms| elapsed >= Duration::from_millis(ms))
        {
            return Some(StopReason::TimeLimit);
        }
        if limits.input_limit.is_some_and(|n| self.stats.attempts >= n) {
            return Some(StopReason::InputLimit);
        }
        if limits.output_limit.is_some_and(|n| self.stats.emitted() >= n) {
            return Some(StopReason::OutputLimit);
        }
        if self.config.stop_on_error_test && self.stats.error_emitted > 0 {
            return Some(StopReason::ErrorTestFound);
        }
        let stats = &self.stats;
        if self.stopper.as_mut().is_some_and(|stop| stop(stats)) {
            return Some(StopReason::Stopper);
        }
        None
    }

    fn execute_seeds(&mut self) -> Result<(), GeneratorError> {
        if self.seeded {
            return Ok(());
        }
        self.seeded = true;
        let seeds = std::mem::take(&mut self.seeds);
        for (index, seed) in seeds.iter().enumerate() {
            seed.check_well_formed(&self.hierarchy)
                .map_err(|source| GeneratorError::MalformedSeed { index, source })?;
            self.seed_filter.insert(seed.clone());
            self.seen.insert(seed.clone());
            for stmt in seed.statements() {
                if let Some(value) = stmt.operation().literal_value() {
                    self.seen_literals.insert(literal_key(stmt.output_type(), value));
                }
            }

            let mut exec = ExecutableSequence::new(seed.clone());
            exec.execute(&self.runner, &mut self.visitors);
            if exec.is_normal_execution() {
                self.pool.put(Arc::new(exec));
            } else {
                warn!(index, "seed sequence did not execute normally; not pooled");
            }
        }
        debug!(
            seeds = seeds.len(),
            pool_types = self.pool.types().len(),
            "seeds executed"
        );
        self.seeds = seeds;
        Ok(())
    }

    fn choose_operation(&mut self) -> Arc<Operation> {
        let index = match &self.weights {
            Some(weights) => weights.sample(&mut self.rng),
            None => self.rng.gen_range(0..self.catalog.len()),
        };
        Arc::clone(&self.catalog[index])
    }

    /// One select, build, execute, classify, feed back iteration.
    fn step(&mut self) -> Result<(), GeneratorError> {
        self.stats.attempts += 1;
        let operation = self.choose_operation();
        self.record(|| Decision::Operation {
            operation: operation.id().to_string(),
        });

        let mut choices = Vec::with_capacity(operation.arity());
        for (input, ty) in operation.input_types().iter().enumerate() {
            match self.select_input(&operation, input, ty) {
                Some(choice) => choices.push(choice),
                None => {
                    debug!(operation = %operation, input, ty = %ty, "no candidate for input");
                    self.stats.input_failures += 1;
                    return Ok(());
                }
            }
        }

        let (candidate, prefix, inherited) = build_candidate(&operation, choices)?;
        candidate.check_well_formed(&self.hierarchy)?;

        if candidate.len() > self.config.limits.max_sequence_length {
            self.stats.too_long += 1;
            return Ok(());
        }
        if !self.seen.insert(candidate.clone()) {
            self.stats.duplicates_skipped += 1;
            return Ok(());
        }

        let mut exec = ExecutableSequence::with_prefix(candidate, prefix);
        for name in inherited {
            exec.add_covered_type(name);
        }
        exec.execute(&self.runner, &mut self.visitors);
        self.stats.executed += 1;

        let classification = self.check_generator.generate(&exec);
        exec.set_checks(classification.checks);
        debug!(
            operation = %operation,
            statements = exec.len(),
            disposition = ?classification.disposition,
            fingerprint = %exec.sequence().fingerprint(),
            "candidate classified"
        );

        match classification.disposition {
            Disposition::Discarded(reason) => {
                match reason {
                    DiscardReason::NonTerminating => self.stats.discarded_nonterminating += 1,
                    DiscardReason::InvalidBehavior => self.stats.discarded_invalid += 1,
                    DiscardReason::NotExecuted => self.stats.discarded_not_executed += 1,
                }
                Ok(())
            }
            Disposition::Error => {
                self.stats.error_classified += 1;
                let exec = Arc::new(exec);
                self.emit(&exec, Disposition::Error);
                Ok(())
            }
            Disposition::Regression => {
                self.stats.regression_classified += 1;
                if exec.is_normal_execution() {
                    self.determine_active_flags(&mut exec)?;
                }
                let exec = Arc::new(exec);
                self.emit(&exec, Disposition::Regression);
                if exec.is_normal_execution() && exec.sequence().has_active_flags() {
                    if self.duplicates.admit(exec.sequence()) {
                        self.pool.put(Arc::clone(&exec));
                        self.stats.pool_additions += 1;
                    } else {
                        self.stats.pool_duplicates += 1;
                    }
                }
                Ok(())
            }
        }
    }

    fn select_input(&mut self, operation: &Operation, input: usize, ty: &Type) -> Option<InputChoice> {
        let nullable = ty.is_reference()
            && !operation.is_receiver_position(input)
            && !self.config.forbid_null;
        if nullable && self.config.null_ratio > 0.0 && self.rng.gen_bool(self.config.null_ratio) {
            self.record(|| Decision::Null { input });
            return Some(InputChoice::Null(ty.clone()));
        }

        let picked = {
            let view = self.pool.get(ty, false);
            match view.len() {
                0 => None,
                len => {
                    let candidate = self.rng.gen_range(0..len);
                    view.get(candidate).map(|seq| (candidate, Arc::clone(seq)))
                }
            }
        };
        let Some((candidate, seq)) = picked else {
            if nullable {
                self.record(|| Decision::Null { input });
                return Some(InputChoice::Null(ty.clone()));
            }
            return None;
        };
        let positions = seq.sequence().positions_usable_as(ty, &self.hierarchy);
        if positions.is_empty() {
            warn!(ty = %ty, "pooled sequence has no usable position for its bucket type");
            return None;
        }
        let position = positions[self.rng.gen_range(0..positions.len())];
        self.record(|| Decision::Argument {
            input,
            candidate,
            position,
        });
        Some(InputChoice::Pooled { seq, position })
    }

    /// Re-evaluate active flags from runtime values. Nulls (injected ones
    /// included) and computed primitive-like results are not reused
    /// directly; a new primitive value is promoted to its own literal
    /// sequence instead.
    fn determine_active_flags(&mut self, exec: &mut ExecutableSequence) -> Result<(), GeneratorError> {
        for index in 0..exec.len() {
            if !exec.sequence().is_active(index) {
                continue;
            }
            let Some(value) = exec.value(index).cloned() else {
                continue;
            };
            let is_literal = exec
                .sequence()
                .statement(index)
                .is_some_and(|s| s.is_literal());

            if value.is_null() {
                exec.sequence_mut().set_active(index, false);
            } else if value.is_primitive_like() && !is_literal {
                exec.sequence_mut().set_active(index, false);
                if self.config.promote_runtime_primitives {
                    self.promote_literal(value)?;
                }
            }
        }
        Ok(())
    }

    fn promote_literal(&mut self, value: Value) -> Result<(), GeneratorError> {
        let Some(ty) = value.runtime_type() else {
            return Ok(());
        };
        if !self.seen_literals.insert(literal_key(&ty, &value)) {
            return Ok(());
        }
        let op = Operation::literal(ty, value.clone())?;
        let seq = Sequence::literal(Arc::new(op))?;
        self.seen.insert(seq.clone());
        debug!(value = %value, "promoted runtime value to literal");
        self.pool.put(Arc::new(ExecutableSequence::with_prefix(
            seq,
            vec![Outcome::normal(value)],
        )));
        self.stats.promoted_literals += 1;
        Ok(())
    }

    fn emit(&mut self, exec: &Arc<ExecutableSequence>, disposition: Disposition) {
        let output = &self.config.output;
        let (enabled, suite_ok) = match disposition {
            Disposition::Regression => (
                output.output_tests && output.regression_tests,
                RegressionTestPredicate.test(exec),
            ),
            Disposition::Error => (
                output.output_tests && output.error_tests,
                ErrorTestPredicate.test(exec),
            ),
            Disposition::Discarded(_) => return,
        };
        let keep = enabled
            && suite_ok
            && self.seed_filter.test(exec)
            && self.output_filter.test(exec);
        if !keep {
            self.stats.filtered_out += 1;
            return;
        }
        match disposition {
            Disposition::Regression => {
                self.stats.regression_emitted += 1;
                self.regression.push(Arc::clone(exec));
            }
            _ => {
                self.stats.error_emitted += 1;
                self.errors.push(Arc::clone(exec));
            }
        }
    }

    fn record(&mut self, decision: impl FnOnce() -> Decision) {
        if self.config.record_decisions {
            self.decisions.push(decision());
        }
    }

    pub fn regression_tests(&self) -> &[Arc<ExecutableSequence>] {
        &self.regression
    }

    pub fn error_tests(&self) -> &[Arc<ExecutableSequence>] {
        &self.errors
    }

    /// The accepted-sequence pool, for diagnostics and reuse.
    pub fn pool(&self) -> &ComponentPool {
        &self.pool
    }

    pub fn hierarchy(&self) -> &Arc<TypeHierarchy> {
        &self.hierarchy
    }

    pub fn stats(&self) -> &GeneratorStats {
        &self.stats
    }

    /// Empty unless `record_decisions` is set.
    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }
}

fn literal_key(ty: &Type, value: &Value) -> String {
    format!("{ty}:{}", value.to_literal_text())
}

/// Splice the chosen argument sequences, each shared sequence once, then
/// append the new statement. Returns the candidate, the outcomes already
/// known for every statement but the last, and the types the spliced
/// statements covered when they ran.
fn build_candidate(
    operation: &Arc<Operation>,
    choices: Vec<InputChoice>,
) -> Result<(Sequence, Vec<Outcome>, BTreeSet<String>), GeneratorError> {
    let mut arena = MutableSequence::new();
    let mut prefix: Vec<Outcome> = Vec::new();
    let mut covered: BTreeSet<String> = BTreeSet::new();
    let mut spliced: HashMap<*const ExecutableSequence, Vec<VarId>> = HashMap::new();
    let mut inputs = Vec::with_capacity(choices.len());

    for choice in choices {
        match choice {
            InputChoice::Pooled { seq, position } => {
                let vars = spliced.entry(Arc::as_ptr(&seq)).or_insert_with(|| {
                    prefix.extend(seq.results().iter().cloned());
                    covered.extend(seq.covered_types().iter().cloned());
                    arena.splice(seq.sequence())
                });
                let var = vars
                    .get(position)
                    .copied()
                    .ok_or(SequenceError::IndexOutOfBounds {
                        index: position,
                        len: vars.len(),
                    })?;
                inputs.push(var);
            }
            InputChoice::Null(ty) => {
                let op = Operation::literal(ty, Value::Null)?;
                inputs.push(arena.push(Arc::new(op), vec![])?);
                prefix.push(Outcome::normal(Value::Null));
            }
        }
    }

    arena.push(Arc::clone(operation), inputs)?;
    Ok((arena.to_sequence()?, prefix, covered))
}
