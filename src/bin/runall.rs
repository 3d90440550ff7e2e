use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use owo_colors::Stream;

use allocbench::config;
use allocbench::display;
use allocbench::suite::{self, SuiteEvent, SuiteOptions};
use allocbench::trial::ProcessRunner;

#[derive(Parser)]
#[command(
    name = "runall",
    version,
    about = "Run every allocator benchmark under a directory, then plot each",
    after_help = "Exit status is the sum of failed trials and plotter exit statuses (capped at 255)."
)]
struct Cli {
    /// Directory containing one subdirectory per benchmark
    bench_root: PathBuf,

    /// Number of trials per thread count
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    iters: u32,

    /// Benchmark to run (repeatable); defaults to the standard list
    #[arg(long = "benchmark", value_name = "NAME")]
    benchmarks: Vec<String>,

    /// TOML file with `allocators` and `max_threads`
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Plotting command, run as `<plotter> <benchmark-dir> <name>`
    #[arg(long)]
    plotter: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<u32> {
    let mut options = SuiteOptions::new(cli.bench_root);
    options.iterations = cli.iters;
    options.plotter = cli.plotter;
    if !cli.benchmarks.is_empty() {
        options.benchmarks = cli.benchmarks;
    }
    if let Some(path) = &cli.settings {
        options.settings = config::load_settings(path)?;
    }

    let stream = Stream::Stdout;
    let (total, _) = suite::run_suite(&options, &mut ProcessRunner, |event| match event {
        SuiteEvent::BenchmarkStarted { benchmark } => {
            println!("benchmark name = {}", benchmark);
            println!(
                "{}",
                display::format_sweep_header(&options.bench_root.join(benchmark), options.iterations, stream)
            );
        }
        SuiteEvent::Sweep(event) => {
            if let Some(line) = display::format_event(event, stream) {
                println!("{}", line);
            }
        }
        SuiteEvent::SweepFailed { error, .. } => eprintln!("{}", error),
        SuiteEvent::PlotFinished { status, .. } => println!("{}", status),
    });

    Ok(total)
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
        Ok(total) => process::exit(total.min(255) as i32),
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}
