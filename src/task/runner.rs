// runner.rs: worker thread that drives one stepped run to a terminal outcome

use super::cancel::CancellationSignal;
use super::sink::ProgressSink;
use super::types::{Outcome, Progress, ProgressRange, TaskError, WaitResult};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::watch;

pub const DEFAULT_STEP_COUNT: usize = 100;
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(50);

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// Shape of a run: how many steps, how long each one takes, and the
/// optional failure injection used to exercise error paths.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    pub step_count: usize,
    pub step_delay: Duration,
    /// Fail with [`TaskError::InjectedFailure`] once the step index exceeds this.
    pub failure_threshold: Option<usize>,
    pub range: ProgressRange,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_COUNT, DEFAULT_STEP_DELAY)
    }
}

impl TaskConfig {
    pub fn new(step_count: usize, step_delay: Duration) -> Self {
        Self {
            step_count,
            step_delay,
            failure_threshold: None,
            range: ProgressRange::default(),
        }
    }

    pub fn with_failure_threshold(mut self, threshold: usize) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    pub fn with_range(mut self, range: ProgressRange) -> Self {
        self.range = range;
        self
    }

    /// Total time the default step work sleeps for a full run.
    pub fn expected_runtime(&self) -> Duration {
        let steps = u32::try_from(self.step_count).unwrap_or(u32::MAX);
        self.step_delay.saturating_mul(steps)
    }

    fn validate(&self) -> Result<(), TaskError> {
        if self.step_count == 0 {
            return Err(TaskError::InvalidConfig(
                "step count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// The simulated work performed after each progress notification.
pub trait StepWork: Send + 'static {
    fn run_step(&mut self, index: usize) -> Result<(), TaskError>;
}

/// Default step work: block the worker thread for a fixed delay.
#[derive(Debug, Clone, Copy)]
pub struct SleepWork {
    delay: Duration,
}

impl SleepWork {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl StepWork for SleepWork {
    fn run_step(&mut self, _index: usize) -> Result<(), TaskError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(())
    }
}

/// Handle to an in-flight run.
///
/// Dropping the handle does not stop the run; the outcome still reaches the
/// handler passed to [`start`].
#[must_use = "dropping a RunHandle leaves no way to wait on or cancel the run"]
#[derive(Debug)]
pub struct RunHandle {
    id: u64,
    signal: CancellationSignal,
    outcome_rx: watch::Receiver<Option<Outcome>>,
    started: Instant,
}

impl RunHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn signal(&self) -> &CancellationSignal {
        &self.signal
    }

    pub fn cancel(&self) {
        self.signal.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.outcome_rx.borrow().is_some()
    }

    /// Snapshot of the terminal outcome, if the run has reached one.
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome_rx.borrow().clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Wait for the terminal outcome, giving up after `timeout` if one is set.
    ///
    /// A timeout leaves the run untouched; call [`RunHandle::cancel`] to stop it.
    pub async fn wait(&mut self, timeout: Option<Duration>) -> WaitResult {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.join()).await {
                Ok(outcome) => WaitResult::Finished(outcome),
                Err(_) => WaitResult::TimedOut,
            },
            None => WaitResult::Finished(self.join().await),
        }
    }

    /// Wait for the terminal outcome with no time limit.
    pub async fn join(&mut self) -> Outcome {
        let waited = self
            .outcome_rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|r| (*r).clone());
        waited
            .or_else(|| self.outcome_rx.borrow().clone())
            .unwrap_or(Outcome::Failed(TaskError::WorkerLost))
    }
}

/// Start a run whose steps sleep for `config.step_delay`.
///
/// `on_outcome` is called exactly once, on the worker thread, before the
/// outcome becomes visible to [`RunHandle::wait`].
pub fn start<S, H>(
    config: &TaskConfig,
    sink: S,
    signal: CancellationSignal,
    on_outcome: H,
) -> Result<RunHandle, TaskError>
where
    S: ProgressSink,
    H: FnOnce(&Outcome) + Send + 'static,
{
    start_with_work(config, SleepWork::new(config.step_delay), sink, signal, on_outcome)
}

/// Start a run with custom step work in place of the default sleep.
pub fn start_with_work<W, S, H>(
    config: &TaskConfig,
    work: W,
    sink: S,
    signal: CancellationSignal,
    on_outcome: H,
) -> Result<RunHandle, TaskError>
where
    W: StepWork,
    S: ProgressSink,
    H: FnOnce(&Outcome) + Send + 'static,
{
    config.validate()?;

    let id = NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed);
    let (outcome_tx, outcome_rx) = watch::channel(None);
    let run = Run {
        id,
        config: config.clone(),
        signal: signal.clone(),
    };

    tracing::debug!(
        run_id = id,
        steps = config.step_count,
        delay_ms = config.step_delay.as_millis() as u64,
        failure_threshold = ?config.failure_threshold,
        "starting run"
    );

    let started = Instant::now();
    std::thread::Builder::new()
        .name(format!("progress-run-{}", id))
        .spawn(move || {
            let outcome = run.execute(work, sink);
            run.finish(outcome, on_outcome, &outcome_tx);
        })
        .map_err(|e| TaskError::Spawn(e.to_string()))?;

    Ok(RunHandle {
        id,
        signal,
        outcome_rx,
        started,
    })
}

/// Worker-owned state of one run.
struct Run {
    id: u64,
    config: TaskConfig,
    signal: CancellationSignal,
}

impl Run {
    fn execute<W: StepWork, S: ProgressSink>(&self, mut work: W, mut sink: S) -> Outcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.step_loop(&mut work, &mut sink))) {
            Ok(outcome) => outcome,
            Err(payload) => Outcome::Failed(TaskError::Panicked(panic_message(payload.as_ref()))),
        }
    }

    fn step_loop<W: StepWork, S: ProgressSink>(&self, work: &mut W, sink: &mut S) -> Outcome {
        let cfg = &self.config;
        for index in 0..cfg.step_count {
            if self.signal.is_cancelled() {
                sink.report(Progress::Canceled);
                return Outcome::Canceled;
            }

            if let Some(threshold) = cfg.failure_threshold
                && index > threshold
            {
                return Outcome::Failed(TaskError::InjectedFailure { index, threshold });
            }

            sink.report(Progress::Step {
                index,
                value: cfg.range.normalize(index, cfg.step_count),
            });

            if let Err(e) = work.run_step(index) {
                return Outcome::Failed(e);
            }
        }
        sink.report(Progress::Complete);
        Outcome::Completed
    }

    fn finish<H>(&self, outcome: Outcome, on_outcome: H, outcome_tx: &watch::Sender<Option<Outcome>>)
    where
        H: FnOnce(&Outcome),
    {
        match &outcome {
            Outcome::Completed => tracing::debug!(run_id = self.id, "run completed"),
            Outcome::Canceled => tracing::info!(run_id = self.id, "run canceled"),
            Outcome::Failed(e) => tracing::warn!(run_id = self.id, error = %e, "run failed"),
        }

        if panic::catch_unwind(AssertUnwindSafe(|| on_outcome(&outcome))).is_err() {
            tracing::error!(run_id = self.id, "outcome handler panicked");
        }

        outcome_tx.send_replace(Some(outcome));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
