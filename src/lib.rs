//! Cancellable, progress-reporting background runs.
//!
//! A run performs a fixed number of steps on its own worker thread, reports
//! normalized progress after each one, checks a [`task::CancellationSignal`]
//! at every step boundary, and ends as completed, canceled or failed. The
//! outcome always reaches the handler passed to [`task::start`].

pub mod event;
pub mod policy;
pub mod state;
pub mod task;
pub mod ui;

pub use policy::{Supervised, WaitPolicy, supervise};
pub use state::DisplayState;
pub use task::{
    CancellationSignal, Outcome, Progress, ProgressRange, ProgressSink, RunHandle, TaskConfig,
    TaskError, WaitResult, cancel, start, start_with_work,
};
