use std::path::{Path, PathBuf};
use std::process::Command;

use crate::sweep::{self, SweepEvent};
use crate::trial::TrialRunner;
use crate::types::{Settings, SweepParameters};

pub const BENCHMARKS: &[&str] = &[
    "cache-scratch",
    "cache-thrash",
    "threadtest",
    "larson",
    "linux-scalability",
    "phong",
];

pub const PLOTTER_NAME: &str = "graphbench.pl";

/// Inputs for a run over several benchmarks under one root.
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    pub bench_root: PathBuf,
    pub benchmarks: Vec<String>,
    pub iterations: u32,
    pub settings: Settings,
    /// Defaults to `<bench_root>/graphbench.pl`.
    pub plotter: Option<PathBuf>,
}

impl SuiteOptions {
    pub fn new(bench_root: impl Into<PathBuf>) -> Self {
        SuiteOptions {
            bench_root: bench_root.into(),
            benchmarks: BENCHMARKS.iter().map(|b| b.to_string()).collect(),
            iterations: 1,
            settings: Settings::default(),
            plotter: None,
        }
    }

    fn plotter_path(&self) -> PathBuf {
        self.plotter
            .clone()
            .unwrap_or_else(|| self.bench_root.join(PLOTTER_NAME))
    }
}

/// Per-benchmark outcome of a suite run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteEntry {
    pub benchmark: String,
    /// Failed trials, or 1 when the sweep itself could not run.
    pub sweep_status: u32,
    pub plot_status: u32,
}

/// Things the suite reports while it runs.
#[derive(Debug)]
pub enum SuiteEvent<'a> {
    BenchmarkStarted { benchmark: &'a str },
    Sweep(&'a SweepEvent<'a>),
    SweepFailed { benchmark: &'a str, error: &'a anyhow::Error },
    PlotFinished { benchmark: &'a str, status: u32 },
}

/// Sweep then plot each benchmark in turn.
///
/// The total is the sum of every sweep's failure count and every plotter exit
/// status, the same number a caller would get from adding up the exit codes
/// of the two steps.
pub fn run_suite<R, F>(options: &SuiteOptions, runner: &mut R, mut on_event: F) -> (u32, Vec<SuiteEntry>)
where
    R: TrialRunner,
    F: FnMut(&SuiteEvent<'_>),
{
    let plotter = options.plotter_path();
    let mut total: u32 = 0;
    let mut entries = Vec::with_capacity(options.benchmarks.len());

    for name in &options.benchmarks {
        on_event(&SuiteEvent::BenchmarkStarted { benchmark: name });

        let params = SweepParameters {
            benchmark_dir: options.bench_root.join(name),
            benchmark_name: name.clone(),
            allocators: options.settings.allocators.clone(),
            max_threads: options.settings.max_threads,
            iterations: options.iterations,
        };

        let sweep_status = match sweep::run_benchmark(&params, runner, |event| {
            on_event(&SuiteEvent::Sweep(event))
        }) {
            Ok(report) => report.failures,
            Err(error) => {
                on_event(&SuiteEvent::SweepFailed {
                    benchmark: name,
                    error: &error,
                });
                1
            }
        };

        let plot_status = run_plotter(&plotter, &params.benchmark_dir, name);
        on_event(&SuiteEvent::PlotFinished {
            benchmark: name,
            status: plot_status,
        });

        total = total.saturating_add(sweep_status).saturating_add(plot_status);
        entries.push(SuiteEntry {
            benchmark: name.clone(),
            sweep_status,
            plot_status,
        });
    }

    (total, entries)
}

/// `<plotter> <benchmark-dir> <name>`; anything but a numeric exit counts as 1.
fn run_plotter(plotter: &Path, benchmark_dir: &Path, name: &str) -> u32 {
    match Command::new(plotter).arg(benchmark_dir).arg(name).status() {
        Ok(status) => status
            .code()
            .map(|code| u32::try_from(code).unwrap_or(1))
            .unwrap_or(1),
        Err(_) => 1,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::results::ResultFile;
    use crate::types::{TrialInvocation, TrialOutcome};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;

    struct FixedRunner(TrialOutcome);

    impl TrialRunner for FixedRunner {
        fn run(
            &mut self,
            _invocation: &TrialInvocation,
            _timeout: Duration,
            _output: &mut ResultFile,
        ) -> anyhow::Result<TrialOutcome> {
            Ok(self.0)
        }
    }

    fn write_plotter(root: &Path, exit: i32) -> PathBuf {
        let path = root.join(PLOTTER_NAME);
        fs::write(&path, format!("#!/bin/sh\necho \"$2\" >> \"$1/plotted\"\nexit {}\n", exit)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn add_benchmark(root: &Path, name: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config"), "[DEFAULT]\nmaxtime = 1\n").unwrap();
    }

    fn options(root: &Path, names: &[&str]) -> SuiteOptions {
        let mut options = SuiteOptions::new(root);
        options.benchmarks = names.iter().map(|n| n.to_string()).collect();
        options.settings.max_threads = 2;
        options
    }

    #[test]
    fn default_benchmark_list() {
        let options = SuiteOptions::new("/bench");
        assert_eq!(options.benchmarks.len(), 6);
        assert_eq!(options.benchmarks[0], "cache-scratch");
        assert_eq!(options.benchmarks[5], "phong");
        assert_eq!(options.plotter_path(), PathBuf::from("/bench/graphbench.pl"));
    }

    #[test]
    fn sums_trial_failures_and_plot_statuses() {
        let tmp = assert_fs::TempDir::new().unwrap();
        write_plotter(tmp.path(), 3);
        add_benchmark(tmp.path(), "larson");
        add_benchmark(tmp.path(), "phong");

        let mut runner = FixedRunner(TrialOutcome::ExitedNonZero(1));
        let (total, entries) = run_suite(&options(tmp.path(), &["larson", "phong"]), &mut runner, |_| {});

        // 2 threads x 1 iteration failing, plus plotter exit 3, per benchmark
        assert_eq!(total, 10);
        assert_eq!(
            entries[0],
            SuiteEntry {
                benchmark: "larson".to_string(),
                sweep_status: 2,
                plot_status: 3
            }
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join("phong/plotted")).unwrap(),
            "phong\n"
        );
    }

    #[test]
    fn broken_benchmark_counts_one_and_continues() {
        let tmp = assert_fs::TempDir::new().unwrap();
        write_plotter(tmp.path(), 0);
        fs::create_dir_all(tmp.path().join("larson")).unwrap();
        add_benchmark(tmp.path(), "phong");

        let mut runner = FixedRunner(TrialOutcome::Success);
        let mut failed = Vec::new();
        let (total, entries) = run_suite(&options(tmp.path(), &["larson", "phong"]), &mut runner, |event| {
            if let SuiteEvent::SweepFailed { benchmark, .. } = event {
                failed.push(benchmark.to_string());
            }
        });

        assert_eq!(total, 1);
        assert_eq!(failed, vec!["larson"]);
        assert_eq!(entries[1].sweep_status, 0);
    }

    #[test]
    fn missing_plotter_counts_one() {
        let tmp = assert_fs::TempDir::new().unwrap();
        add_benchmark(tmp.path(), "larson");

        let mut runner = FixedRunner(TrialOutcome::Success);
        let (total, entries) = run_suite(&options(tmp.path(), &["larson"]), &mut runner, |_| {});
        assert_eq!(total, 1);
        assert_eq!(entries[0].plot_status, 1);
    }
}
