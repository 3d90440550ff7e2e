use std::path::Path;

use owo_colors::{OwoColorize, Stream, Style};

use crate::sweep::{SweepEvent, SweepReport};
use crate::types::TrialInvocation;

fn style_heading() -> Style {
    Style::new().bold()
}

fn style_failure() -> Style {
    Style::new().red().bold()
}

fn style_success() -> Style {
    Style::new().green()
}

/// Opening lines of a sweep: directory and iteration count.
pub fn format_sweep_header(benchmark_dir: &Path, iterations: u32, stream: Stream) -> String {
    format!(
        "{}\n{}",
        format!("=== dir = {}", benchmark_dir.display())
            .if_supports_color(stream, |s| s.style(style_heading())),
        format!("=== iters = {}", iterations)
            .if_supports_color(stream, |s| s.style(style_heading())),
    )
}

/// `Running '[...]' with timeout N`
pub fn format_running(invocation: &TrialInvocation, max_time_secs: u64) -> String {
    let quoted: Vec<String> = invocation
        .command_line()
        .iter()
        .map(|a| format!("'{}'", a))
        .collect();
    format!(
        "Running '[{}]' with timeout {}",
        quoted.join(", "),
        max_time_secs
    )
}

/// Progress line for one sweep event, `None` when the event prints nothing.
pub fn format_event(event: &SweepEvent<'_>, stream: Stream) -> Option<String> {
    match event {
        SweepEvent::AllocatorStarted { allocator } => Some(format!("allocator name = {}", allocator)),
        SweepEvent::ThreadsStarted { threads, .. } => Some(format!("Thread {}", threads)),
        SweepEvent::TrialStarted {
            invocation,
            max_time_secs,
        } => Some(format_running(invocation, *max_time_secs)),
        SweepEvent::TrialFinished { outcome, .. } if outcome.is_failure() => Some(
            format!("  trial failed: {}", outcome)
                .if_supports_color(stream, |s| s.style(style_failure()))
                .to_string(),
        ),
        SweepEvent::TrialFinished { .. } => None,
    }
}

/// One-line summary printed when a sweep finishes.
pub fn format_summary(report: &SweepReport, stream: Stream) -> String {
    let trials = report.allocators.len() as u64
        * u64::from(report.max_threads)
        * u64::from(report.iterations);
    let elapsed = (report.finished_at - report.started_at).num_seconds();

    let line = format!(
        "{}: {} of {} trials failed in {}s",
        report.benchmark, report.failures, trials, elapsed
    );
    if report.failures == 0 {
        line.if_supports_color(stream, |s| s.style(style_success()))
            .to_string()
    } else {
        line.if_supports_color(stream, |s| s.style(style_failure()))
            .to_string()
    }
}

pub fn format_json(report: &SweepReport) -> String {
    let mut out = serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TrialOutcome, signal_name};
    use chrono::{TimeDelta, Utc};
    use std::path::PathBuf;

    fn invocation() -> TrialInvocation {
        TrialInvocation {
            allocator: "libc".to_string(),
            threads: 2,
            iteration: 1,
            program: PathBuf::from("./larson/larson-libc"),
            args: vec!["2".to_string(), "10".to_string()],
        }
    }

    fn report(failures: u32) -> SweepReport {
        let started_at = Utc::now();
        SweepReport {
            benchmark: "larson".to_string(),
            benchmark_dir: PathBuf::from("./larson"),
            iterations: 3,
            allocators: vec!["libc".to_string()],
            max_threads: 8,
            started_at,
            finished_at: started_at + TimeDelta::seconds(42),
            result_files: vec![PathBuf::from("./larson/Results/libc/larson-1")],
            failures,
        }
    }

    #[test]
    fn running_line_lists_the_command() {
        assert_eq!(
            format_running(&invocation(), 30),
            "Running '['./larson/larson-libc', '2', '10']' with timeout 30"
        );
    }

    #[test]
    fn event_lines() {
        let inv = invocation();
        assert_eq!(
            format_event(&SweepEvent::AllocatorStarted { allocator: "libc" }, Stream::Stdout)
                .as_deref(),
            Some("allocator name = libc")
        );
        assert_eq!(
            format_event(
                &SweepEvent::ThreadsStarted {
                    allocator: "libc",
                    threads: 3
                },
                Stream::Stdout
            )
            .as_deref(),
            Some("Thread 3")
        );
        assert!(
            format_event(
                &SweepEvent::TrialFinished {
                    invocation: &inv,
                    outcome: TrialOutcome::Success
                },
                Stream::Stdout
            )
            .is_none()
        );
        let failed = format_event(
            &SweepEvent::TrialFinished {
                invocation: &inv,
                outcome: TrialOutcome::KilledBySignal(6),
            },
            Stream::Stdout,
        )
        .unwrap();
        assert!(failed.contains("trial failed"));
        assert!(failed.contains(&signal_name(6)));
    }

    #[test]
    fn header_mentions_dir_and_iters() {
        let header = format_sweep_header(Path::new("./phong"), 4, Stream::Stdout);
        assert!(header.contains("=== dir = ./phong"));
        assert!(header.contains("=== iters = 4"));
    }

    #[test]
    fn summary_counts_trials() {
        let summary = format_summary(&report(5), Stream::Stdout);
        assert!(summary.contains("larson: 5 of 24 trials failed in 42s"));
    }

    #[test]
    fn json_has_report_fields() {
        let parsed: serde_json::Value = serde_json::from_str(&format_json(&report(0))).unwrap();
        assert_eq!(parsed["benchmark"], "larson");
        assert_eq!(parsed["failures"], 0);
        assert_eq!(parsed["max_threads"], 8);
        assert!(parsed["started_at"].as_str().unwrap().ends_with('Z'));
        assert_eq!(parsed["result_files"].as_array().unwrap().len(), 1);
    }
}
