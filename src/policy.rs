// policy.rs: how the initiating side waits on a run it started

use crate::task::{Outcome, RunHandle, TaskConfig, TaskError, WaitResult};
use std::time::Duration;

/// Caller-side wait behavior after starting a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitPolicy {
    /// Return immediately; the outcome only reaches the run's handler.
    NoWait,
    /// Wait for the terminal outcome however long it takes.
    Blocking,
    /// Wait up to the given duration, then cancel and wait for the run to stop.
    Timeout(Duration),
}

impl WaitPolicy {
    /// Timeout policy scaled from the run's expected duration. A factor below
    /// 1.0 gives up before a full run can finish. The factor must be finite
    /// and positive; a product too large for `Duration` saturates.
    pub fn timeout_from_factor(config: &TaskConfig, factor: f64) -> Result<Self, TaskError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(TaskError::InvalidConfig(format!(
                "timeout factor must be finite and positive (got {})",
                factor
            )));
        }
        let secs = config.expected_runtime().as_secs_f64() * factor;
        let limit = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
        Ok(WaitPolicy::Timeout(limit))
    }
}

/// What [`supervise`] observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Supervised {
    Detached,
    Finished(Outcome),
    /// The wait timed out, cancellation was requested, and the run then
    /// ended with this outcome.
    TimedOut(Outcome),
}

impl Supervised {
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Supervised::Detached => None,
            Supervised::Finished(o) | Supervised::TimedOut(o) => Some(o),
        }
    }
}

/// Apply `policy` to a started run.
pub async fn supervise(mut handle: RunHandle, policy: WaitPolicy) -> Supervised {
    match policy {
        WaitPolicy::NoWait => {
            tracing::debug!(run_id = handle.id(), "not waiting for run");
            Supervised::Detached
        }
        WaitPolicy::Blocking => Supervised::Finished(handle.join().await),
        WaitPolicy::Timeout(limit) => match handle.wait(Some(limit)).await {
            WaitResult::Finished(outcome) => Supervised::Finished(outcome),
            WaitResult::TimedOut => {
                tracing::info!(
                    run_id = handle.id(),
                    waited_ms = limit.as_millis() as u64,
                    "wait timed out, canceling run"
                );
                handle.cancel();
                Supervised::TimedOut(handle.join().await)
            }
        },
    }
}
