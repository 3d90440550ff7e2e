use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config;
use crate::errors::HarnessError;
use crate::results::ResultStore;
use crate::trial::TrialRunner;
use crate::types::{BenchmarkConfig, SweepParameters, TrialInvocation, TrialOutcome};

/// Progress notifications emitted while a sweep runs.
#[derive(Debug)]
pub enum SweepEvent<'a> {
    AllocatorStarted { allocator: &'a str },
    ThreadsStarted { allocator: &'a str, threads: u32 },
    TrialStarted { invocation: &'a TrialInvocation, max_time_secs: u64 },
    TrialFinished { invocation: &'a TrialInvocation, outcome: TrialOutcome },
}

/// What a finished sweep leaves behind.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub benchmark: String,
    pub benchmark_dir: PathBuf,
    pub iterations: u32,
    pub allocators: Vec<String>,
    pub max_threads: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub result_files: Vec<PathBuf>,
    pub failures: u32,
}

/// Load `<benchmark_dir>/config` and sweep it.
///
/// The config is read before anything is created on disk, so a missing or
/// malformed config leaves the benchmark directory untouched.
pub fn run_benchmark<R, F>(params: &SweepParameters, runner: &mut R, on_event: F) -> Result<SweepReport>
where
    R: TrialRunner,
    F: FnMut(&SweepEvent<'_>),
{
    let config = config::load_benchmark_config(&params.benchmark_dir)?;
    run_sweep(params, &config, runner, on_event)
}

/// Run every allocator x thread count x iteration trial in order.
///
/// Trial failures are counted and never stop the sweep; only errors from the
/// result store or from launching a trial abort it.
pub fn run_sweep<R, F>(
    params: &SweepParameters,
    config: &BenchmarkConfig,
    runner: &mut R,
    mut on_event: F,
) -> Result<SweepReport>
where
    R: TrialRunner,
    F: FnMut(&SweepEvent<'_>),
{
    if params.iterations == 0 {
        return Err(HarnessError::InvalidIterations.into());
    }

    let started_at = Utc::now();
    let store = ResultStore::open(&params.benchmark_dir)?;
    let timeout = config.timeout();
    let mut failures: u32 = 0;
    let mut result_files = Vec::new();

    for allocator in &params.allocators {
        on_event(&SweepEvent::AllocatorStarted { allocator });
        store.ensure_allocator_dir(allocator)?;
        let program = params.binary_path(allocator);

        for threads in 1..=params.max_threads {
            on_event(&SweepEvent::ThreadsStarted { allocator, threads });
            let mut output = store.open_result_file(allocator, &params.benchmark_name, threads)?;
            result_files.push(output.path().to_path_buf());

            let mut args = Vec::with_capacity(config.extra_args.len() + 1);
            args.push(threads.to_string());
            args.extend(config.extra_args.iter().cloned());

            for iteration in 1..=params.iterations {
                let invocation = TrialInvocation {
                    allocator: allocator.clone(),
                    threads,
                    iteration,
                    program: program.clone(),
                    args: args.clone(),
                };
                on_event(&SweepEvent::TrialStarted {
                    invocation: &invocation,
                    max_time_secs: config.max_time_secs,
                });

                let outcome = runner.run(&invocation, timeout, &mut output)?;
                if outcome.is_failure() {
                    failures = failures.saturating_add(1);
                }

                on_event(&SweepEvent::TrialFinished {
                    invocation: &invocation,
                    outcome,
                });
            }

            output.close()?;
        }
    }

    Ok(SweepReport {
        benchmark: params.benchmark_name.clone(),
        benchmark_dir: params.benchmark_dir.clone(),
        iterations: params.iterations,
        allocators: params.allocators.clone(),
        max_threads: params.max_threads,
        started_at,
        finished_at: Utc::now(),
        result_files,
        failures,
    })
}
