use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use owo_colors::Stream;

use allocbench::config;
use allocbench::display;
use allocbench::sweep;
use allocbench::trial::ProcessRunner;
use allocbench::types::{Settings, SweepParameters};

#[derive(Parser)]
#[command(
    name = "runbench",
    version,
    about = "Run one allocator benchmark across thread counts",
    after_help = "Exit status is the number of failed trials (capped at 255), or 1 on a fatal error."
)]
struct Cli {
    /// Directory containing the benchmark executables, `config` and `Results`
    benchmark_dir: PathBuf,

    /// Base name of the benchmark executable (`<name>-<allocator>`)
    name: String,

    /// Number of trials per thread count
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    iters: u32,

    /// TOML file with `allocators` and `max_threads`
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Allocator to test (repeatable); overrides the settings file
    #[arg(long = "allocator", value_name = "NAME")]
    allocators: Vec<String>,

    /// Highest thread count to run; overrides the settings file
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_threads: Option<u32>,

    /// Print a JSON report on stdout; progress goes to stderr
    #[arg(long)]
    json: bool,
}

fn run(cli: Cli) -> Result<u32> {
    let mut settings = match &cli.settings {
        Some(path) => config::load_settings(path)?,
        None => Settings::default(),
    };
    if !cli.allocators.is_empty() {
        settings.allocators = cli.allocators;
    }
    if let Some(max_threads) = cli.max_threads {
        settings.max_threads = max_threads;
    }

    let params = SweepParameters {
        benchmark_dir: cli.benchmark_dir,
        benchmark_name: cli.name,
        allocators: settings.allocators,
        max_threads: settings.max_threads,
        iterations: cli.iters,
    };

    let stream = if cli.json { Stream::Stderr } else { Stream::Stdout };
    let emit = |line: &str| {
        if cli.json {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    };

    emit(&display::format_sweep_header(&params.benchmark_dir, params.iterations, stream));

    let report = sweep::run_benchmark(&params, &mut ProcessRunner, |event| {
        if let Some(line) = display::format_event(event, stream) {
            emit(&line);
        }
    })?;

    if cli.json {
        print!("{}", display::format_json(&report));
    } else {
        println!("{}", display::format_summary(&report, stream));
    }

    Ok(report.failures)
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            process::exit(code);
        }
    };

    match run(cli) {
        Ok(failures) => process::exit(failures.min(255) as i32),
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}
