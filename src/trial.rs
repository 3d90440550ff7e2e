use std::process::{Child, Command, ExitStatus};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::errors::HarnessError;
use crate::results::ResultFile;
use crate::types::{TrialInvocation, TrialOutcome};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Executes one trial and reports how it ended.
pub trait TrialRunner {
    fn run(
        &mut self,
        invocation: &TrialInvocation,
        timeout: Duration,
        output: &mut ResultFile,
    ) -> Result<TrialOutcome>;
}

/// Runs trials as child processes, output captured into the result file.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl TrialRunner for ProcessRunner {
    fn run(
        &mut self,
        invocation: &TrialInvocation,
        timeout: Duration,
        output: &mut ResultFile,
    ) -> Result<TrialOutcome> {
        let (stdout, stderr) = output.child_stdio()?;

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| HarnessError::SpawnError {
                program: invocation.program.clone(),
                source,
            })?;

        let outcome = match wait_with_timeout(&mut child, timeout) {
            Ok(Some(status)) => classify(status),
            Ok(None) => TrialOutcome::TimedOut,
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(HarnessError::WaitError {
                    program: invocation.program.clone(),
                    source,
                }
                .into());
            }
        };

        if let Some(line) = outcome.annotation() {
            output.write_line(&line)?;
        }

        Ok(outcome)
    }
}

/// Wait for `child` up to `timeout`. On expiry the child is killed and
/// reaped, and `None` is returned. A timeout too large to represent as an
/// `Instant` means no deadline.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now().checked_add(timeout);

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if deadline.is_some_and(|d| now >= d) {
            // The child may exit between the check and the kill.
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        let pause = match deadline {
            Some(d) => POLL_INTERVAL.min(d - now),
            None => POLL_INTERVAL,
        };
        std::thread::sleep(pause);
    }
}

/// Map an exit status onto a trial outcome.
pub fn classify(status: ExitStatus) -> TrialOutcome {
    if status.success() {
        return TrialOutcome::Success;
    }
    if let Some(code) = status.code() {
        return TrialOutcome::ExitedNonZero(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return TrialOutcome::KilledBySignal(signal);
        }
    }

    TrialOutcome::ExitedNonZero(-1)
}
