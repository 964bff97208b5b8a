use clap::{Parser, ValueEnum};
use progress_task::event::{Event, forwarders};
use progress_task::task::{DEFAULT_STEP_COUNT, DEFAULT_STEP_DELAY};
use progress_task::ui::{PipeOptions, display_progress_pipe};
use progress_task::{
    CancellationSignal, DisplayState, Outcome, Supervised, TaskConfig, WaitPolicy, start, supervise,
};
use std::error::Error;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// How the demo waits on the run it starts.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Fire and forget; the outcome handler still reports the result
    None,
    /// Wait until the run finishes
    Blocking,
    /// Wait a fraction of the expected runtime, then cancel
    Timeout,
}

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Number of steps in the run. Falls back to PROGRESS_DEMO_STEPS, then 100.
    #[arg(long)]
    steps: Option<usize>,
    /// Simulated work per step, in milliseconds
    #[arg(long, default_value_t = DEFAULT_STEP_DELAY.as_millis() as u64)]
    delay_ms: u64,
    /// Fail the run once the step index exceeds this threshold
    #[arg(long, value_name = "STEP")]
    throw_after: Option<usize>,
    /// Wait behavior after starting the run
    #[arg(long, value_enum, default_value_t = WaitMode::Blocking)]
    wait: WaitMode,
    /// Fraction of the expected runtime to wait for in `--wait timeout`
    #[arg(long, default_value_t = 0.25)]
    timeout_factor: f64,
    /// Request cancellation after this step has been shown
    #[arg(long, value_name = "STEP")]
    cancel_after: Option<usize>,
    /// Emit JSON lines instead of plain text
    #[arg(long)]
    json: bool,
    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug_log: bool,
}

fn steps_from_env_if_missing(cli: &mut Config) {
    if cli.steps.is_none()
        && let Ok(s) = std::env::var("PROGRESS_DEMO_STEPS")
        && let Ok(n) = s.trim().parse::<usize>()
    {
        cli.steps = Some(n);
    }
}

fn init_tracing(debug_log: bool) {
    let default_level = if debug_log { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut cfg = Config::parse();
    steps_from_env_if_missing(&mut cfg);
    init_tracing(cfg.debug_log);

    let mut task_config = TaskConfig::new(
        cfg.steps.unwrap_or(DEFAULT_STEP_COUNT),
        Duration::from_millis(cfg.delay_ms),
    );
    if let Some(threshold) = cfg.throw_after {
        task_config = task_config.with_failure_threshold(threshold);
    }

    let policy = match cfg.wait {
        WaitMode::None => WaitPolicy::NoWait,
        WaitMode::Blocking => WaitPolicy::Blocking,
        WaitMode::Timeout => WaitPolicy::timeout_from_factor(&task_config, cfg.timeout_factor)?,
    };

    let mut state = DisplayState::new(task_config.range);
    if !state.try_begin() {
        return Err("a run is already active".into());
    }

    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let (sink, on_outcome) = forwarders(tx);
    let signal = CancellationSignal::new();
    let handle = start(&task_config, sink, signal.clone(), on_outcome)?;

    // Ctrl-C asks the run to stop at its next step boundary.
    let interrupt = signal.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });
    tracing::debug!(run_id = handle.id(), ?policy, "run launched");

    let supervisor = tokio::spawn(supervise(handle, policy));

    let opts = PipeOptions {
        json: cfg.json,
        cancel_after: cfg.cancel_after,
    };
    let mut stdout = std::io::stdout();
    let outcome = display_progress_pipe(rx, &signal, &mut state, opts, &mut stdout).await?;

    match supervisor.await? {
        Supervised::TimedOut(_) => tracing::info!("wait timed out before the run finished"),
        Supervised::Detached => tracing::debug!("front-end continued without waiting"),
        Supervised::Finished(_) => {}
    }

    // Print error if any, for better diagnostics
    match outcome {
        Some(Outcome::Failed(e)) => {
            eprintln!("Error: {}", e);
            Err(e.into())
        }
        Some(_) => Ok(()),
        None => Err("run ended without reporting an outcome".into()),
    }
}
