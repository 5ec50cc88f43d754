//! seqgen: run the forward generator against the built-in demo target
//!
//! ## Example Usage
//!
//! ```bash
//! # 500 attempts with a fixed seed
//! seqgen --seed 7 --input-limit 500
//!
//! # Treat unchecked faults as errors and isolate each statement
//! seqgen --input-limit 200 --unchecked error --mode isolated --statement-timeout-ms 100
//!
//! # Start from a JSON config and print the report as JSON
//! seqgen --config gen.json --json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use regex::Regex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seqgen::demo::{self, DemoExecutor};
use seqgen::execution::{CoverageVisitor, SharedCoverage};
use seqgen::filter::{AlwaysTrue, IncludeIfCovers, IncludeIfTypeNameMatches, TestPredicateExt};
use seqgen::{
    BehaviorType, ExecutableSequence, ExecutionMode, Executor, ForwardGenerator, GenerationReport,
    GeneratorConfig, TestPredicate,
};

#[derive(Parser, Debug)]
#[command(
    name = "seqgen",
    version,
    about = "Feedback-directed random test generation",
    long_about = "Builds call sequences over the demo operation catalog, executes them, \
                  and sorts the results into regression and error-revealing tests.\n\n\
                  Flags override values loaded from --config."
)]
struct Cli {
    /// JSON generator config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Wall-clock limit for the whole run
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Maximum number of candidate attempts
    #[arg(long)]
    input_limit: Option<u64>,

    /// Maximum number of emitted tests
    #[arg(long)]
    output_limit: Option<u64>,

    /// Maximum statements per sequence
    #[arg(long)]
    max_length: Option<usize>,

    /// Probability of passing null to a non-receiver reference input
    #[arg(long)]
    null_ratio: Option<f64>,

    /// Never pass null
    #[arg(long)]
    forbid_null: bool,

    /// Behavior for checked faults (expected, error, invalid)
    #[arg(long)]
    checked: Option<BehaviorType>,

    /// Behavior for unchecked faults
    #[arg(long)]
    unchecked: Option<BehaviorType>,

    /// Behavior for null dereferences caused by a null input
    #[arg(long)]
    null_on_null: Option<BehaviorType>,

    /// Behavior for null dereferences with only non-null inputs
    #[arg(long)]
    null_on_non_null: Option<BehaviorType>,

    /// Behavior for resource exhaustion
    #[arg(long)]
    resource_exhaustion: Option<BehaviorType>,

    /// Statement execution mode (inline, isolated)
    #[arg(long)]
    mode: Option<ExecutionMode>,

    /// Per-statement time budget
    #[arg(long)]
    statement_timeout_ms: Option<u64>,

    /// Only emit tests mentioning a type whose name matches this regex
    #[arg(long)]
    include: Option<String>,

    /// Only emit tests whose execution passed through one of these types
    #[arg(long = "cover", num_args(1..))]
    cover: Vec<String>,

    /// Omit regression checks
    #[arg(long)]
    no_regression_assertions: bool,

    /// Stop after the first error-revealing test
    #[arg(long)]
    stop_on_error: bool,

    /// Output as JSON instead of human-readable format
    #[arg(long)]
    json: bool,

    /// Verbose output (debug logging)
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn generator_config(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::from_json_file(path)?,
            None => GeneratorConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.time_limit_ms.is_some() {
            config.limits.time_limit_ms = self.time_limit_ms;
        }
        if self.input_limit.is_some() {
            config.limits.input_limit = self.input_limit;
        }
        if self.output_limit.is_some() {
            config.limits.output_limit = self.output_limit;
        }
        if let Some(max) = self.max_length {
            config.limits.max_sequence_length = max;
        }
        if let Some(ratio) = self.null_ratio {
            config.null_ratio = ratio;
        }
        config.forbid_null |= self.forbid_null;
        config.no_regression_assertions |= self.no_regression_assertions;
        config.stop_on_error_test |= self.stop_on_error;

        let behavior = &mut config.behavior;
        for (flag, slot) in [
            (self.checked, &mut behavior.checked),
            (self.unchecked, &mut behavior.unchecked),
            (self.null_on_null, &mut behavior.null_on_null_input),
            (self.null_on_non_null, &mut behavior.null_on_non_null_input),
            (self.resource_exhaustion, &mut behavior.resource_exhaustion),
        ] {
            if let Some(value) = flag {
                *slot = value;
            }
        }

        if let Some(mode) = self.mode {
            config.execution.mode = mode;
        }
        if let Some(ms) = self.statement_timeout_ms {
            config.execution.statement_timeout_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }

    fn output_filter(&self) -> Result<Box<dyn TestPredicate>> {
        let mut filter: Box<dyn TestPredicate> = Box::new(AlwaysTrue);
        if let Some(pattern) = &self.include {
            let regex = Regex::new(pattern)
                .with_context(|| format!("Invalid --include pattern '{pattern}'"))?;
            filter = Box::new(filter.and(IncludeIfTypeNameMatches::new(regex)));
        }
        if !self.cover.is_empty() {
            filter = Box::new(filter.and(IncludeIfCovers::new(self.cover.iter().cloned())));
        }
        Ok(filter)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).without_time())
        .init();

    let config = cli.generator_config()?;
    let coverage = SharedCoverage::new();
    let executor: Arc<dyn Executor> = if cli.cover.is_empty() {
        Arc::new(DemoExecutor::new())
    } else {
        Arc::new(DemoExecutor::with_coverage(coverage.clone()))
    };

    let mut generator = ForwardGenerator::new(demo::catalog(), executor, config)
        .context("Failed to set up generator")?
        .with_hierarchy(demo::hierarchy())
        .with_output_filter(cli.output_filter()?);
    if !cli.cover.is_empty() {
        generator = generator.with_visitor(CoverageVisitor::designated(coverage, cli.cover.clone()));
    }

    let report = generator.explore().context("Generation failed")?;
    info!(run_id = %report.run_id, "run complete");

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, generator.error_tests());
    }
    Ok(())
}

fn print_report(report: &GenerationReport, error_tests: &[Arc<ExecutableSequence>]) {
    let stats = &report.stats;
    println!(
        "Generation finished: {} (seed: {}, {}ms)",
        report.stop_reason, report.seed, report.elapsed_ms
    );
    println!();
    println!("Candidates:");
    println!("  Attempts:          {:>6}", stats.attempts);
    println!("  Executed:          {:>6}", stats.executed);
    println!("  Input failures:    {:>6}", stats.input_failures);
    println!("  Duplicates:        {:>6}", stats.duplicates_skipped);
    println!("  Too long:          {:>6}", stats.too_long);
    println!();
    println!("Dispositions:");
    println!("  Regression:        {:>6}", stats.regression_classified);
    println!("  Error:             {:>6}", stats.error_classified);
    println!("  Invalid:           {:>6}", stats.discarded_invalid);
    println!("  Non-terminating:   {:>6}", stats.discarded_nonterminating);
    println!("  Not executed:      {:>6}", stats.discarded_not_executed);
    println!();
    println!(
        "Emitted: {} regression, {} error ({} filtered)",
        stats.regression_emitted, stats.error_emitted, stats.filtered_out
    );
    println!(
        "Pool: {} types, {} entries, {} promoted literals",
        report.pool_types, report.pool_entries, stats.promoted_literals
    );

    if !error_tests.is_empty() {
        println!();
        println!("Error-revealing tests:");
        for test in error_tests.iter().take(5) {
            let checks = test.checks();
            let reason = match (&checks.exception, checks.violations.first()) {
                (Some(exc), _) => format!("{} at statement {}", exc.fault_name, exc.index),
                (None, Some(v)) => format!("{} violated at statement {}", v.contract, v.index),
                (None, None) => "unknown".to_string(),
            };
            println!("  -- {reason}");
            for line in test.sequence().to_string().lines() {
                println!("     {line}");
            }
        }
        if error_tests.len() > 5 {
            println!("  ... and {} more", error_tests.len() - 5);
        }
    }
}
