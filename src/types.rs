use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_ALLOCATOR: &str = "libc";
pub const DEFAULT_MAX_THREADS: u32 = 8;

/// Per-benchmark settings read from `<benchmark-dir>/config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkConfig {
    pub max_time_secs: u64,
    pub extra_args: Vec<String>,
}

impl BenchmarkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.max_time_secs)
    }
}

/// Everything the sweep needs besides the benchmark config.
#[derive(Debug, Clone)]
pub struct SweepParameters {
    pub benchmark_dir: PathBuf,
    pub benchmark_name: String,
    pub allocators: Vec<String>,
    pub max_threads: u32,
    pub iterations: u32,
}

impl SweepParameters {
    /// Parameters with the stock allocator list and thread ceiling.
    pub fn new(benchmark_dir: impl Into<PathBuf>, benchmark_name: &str, iterations: u32) -> Self {
        let settings = Settings::default();
        SweepParameters {
            benchmark_dir: benchmark_dir.into(),
            benchmark_name: benchmark_name.to_string(),
            allocators: settings.allocators,
            max_threads: settings.max_threads,
            iterations,
        }
    }

    /// `<benchmark-dir>/<name>-<allocator>`
    pub fn binary_path(&self, allocator: &str) -> PathBuf {
        self.benchmark_dir
            .join(format!("{}-{}", self.benchmark_name, allocator))
    }
}

/// Optional sweep settings file (`--settings`), TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_allocators")]
    pub allocators: Vec<String>,
    #[serde(default = "default_max_threads")]
    pub max_threads: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            allocators: default_allocators(),
            max_threads: default_max_threads(),
        }
    }
}

fn default_allocators() -> Vec<String> {
    vec![DEFAULT_ALLOCATOR.to_string()]
}

fn default_max_threads() -> u32 {
    DEFAULT_MAX_THREADS
}

/// One timed execution, built fresh for every trial.
#[derive(Debug, Clone)]
pub struct TrialInvocation {
    pub allocator: String,
    pub threads: u32,
    pub iteration: u32,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl TrialInvocation {
    /// Program followed by its arguments, as one list.
    pub fn command_line(&self) -> Vec<String> {
        let mut line = Vec::with_capacity(self.args.len() + 1);
        line.push(self.program.to_string_lossy().into_owned());
        line.extend(self.args.iter().cloned());
        line
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    Success,
    TimedOut,
    ExitedNonZero(i32),
    KilledBySignal(i32),
}

impl TrialOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, TrialOutcome::Success)
    }

    /// Line appended to the result file, `None` for a clean exit.
    pub fn annotation(&self) -> Option<String> {
        match self {
            TrialOutcome::Success => None,
            TrialOutcome::TimedOut => Some("Killed. Timed out.".to_string()),
            TrialOutcome::ExitedNonZero(code) => Some(format!("Died. {}", code)),
            TrialOutcome::KilledBySignal(signal) => Some(format!("Died. {}", signal_name(*signal))),
        }
    }
}

impl fmt::Display for TrialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialOutcome::Success => write!(f, "ok"),
            TrialOutcome::TimedOut => write!(f, "timed out"),
            TrialOutcome::ExitedNonZero(code) => write!(f, "exit {}", code),
            TrialOutcome::KilledBySignal(signal) => write!(f, "{}", signal_name(*signal)),
        }
    }
}

/// Conventional `SIGxxx` name for a signal number, `signal N` when the
/// number has no known name on this platform.
pub fn signal_name(signal: i32) -> String {
    match known_signal_name(signal) {
        Some(name) => name.to_string(),
        None => format!("signal {}", signal),
    }
}

#[cfg(target_os = "linux")]
fn known_signal_name(signal: i32) -> Option<&'static str> {
    let name = match signal {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        4 => "SIGILL",
        5 => "SIGTRAP",
        6 => "SIGABRT",
        7 => "SIGBUS",
        8 => "SIGFPE",
        9 => "SIGKILL",
        10 => "SIGUSR1",
        11 => "SIGSEGV",
        12 => "SIGUSR2",
        13 => "SIGPIPE",
        14 => "SIGALRM",
        15 => "SIGTERM",
        16 => "SIGSTKFLT",
        17 => "SIGCHLD",
        18 => "SIGCONT",
        19 => "SIGSTOP",
        20 => "SIGTSTP",
        21 => "SIGTTIN",
        22 => "SIGTTOU",
        23 => "SIGURG",
        24 => "SIGXCPU",
        25 => "SIGXFSZ",
        26 => "SIGVTALRM",
        27 => "SIGPROF",
        28 => "SIGWINCH",
        29 => "SIGIO",
        30 => "SIGPWR",
        31 => "SIGSYS",
        _ => return None,
    };
    Some(name)
}

// Numbering differs across the BSDs and macOS.
#[cfg(not(target_os = "linux"))]
fn known_signal_name(_signal: i32) -> Option<&'static str> {
    None
}
