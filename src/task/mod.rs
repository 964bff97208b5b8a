// task/mod.rs - cancellable, progress-reporting background runs
pub mod cancel;
pub mod runner;
pub mod sink;
pub mod types;

pub use cancel::{CancellationSignal, cancel};
pub use runner::{
    DEFAULT_STEP_COUNT, DEFAULT_STEP_DELAY, RunHandle, SleepWork, StepWork, TaskConfig, start,
    start_with_work,
};
pub use sink::{ChannelSink, ProgressSink, channel_sink};
pub use types::{Outcome, Progress, ProgressRange, TaskError, WaitResult};
