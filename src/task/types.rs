use serde::Serialize;
use thiserror::Error;

/// Errors a run can terminate with, or that `start` can refuse with.
///
/// Cancellation is deliberately absent: a canceled run ends with
/// [`Outcome::Canceled`], never with an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("Invalid task configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(String),
    #[error("Step {index} exceeds failure threshold {threshold}")]
    InjectedFailure { index: usize, threshold: usize },
    #[error("Step {index} failed: {message}")]
    Step { index: usize, message: String },
    #[error("Worker panicked: {0}")]
    Panicked(String),
    #[error("Worker exited without reporting an outcome")]
    WorkerLost,
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed,
    Canceled,
    Failed(TaskError),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Outcome::Canceled)
    }

    pub fn error(&self) -> Option<&TaskError> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Completed => write!(f, "completed"),
            Outcome::Canceled => write!(f, "canceled"),
            Outcome::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Result of waiting on a run with an optional timeout.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitResult {
    Finished(Outcome),
    /// The wait gave up; the run itself is still going.
    TimedOut,
}

impl WaitResult {
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            WaitResult::Finished(o) => Some(o),
            WaitResult::TimedOut => None,
        }
    }
}

/// One notification delivered to a progress sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Progress {
    Step { index: usize, value: f64 },
    Complete,
    Canceled,
}

pub const CANCELED_CODE: i64 = -2;
pub const COMPLETE_CODE: i64 = -1;

impl Progress {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Progress::Step { .. })
    }

    /// Integer form used by older progress consumers: `-2` canceled,
    /// `-1` complete, otherwise the step value truncated toward zero.
    pub fn code(&self) -> i64 {
        match self {
            Progress::Step { value, .. } => *value as i64,
            Progress::Complete => COMPLETE_CODE,
            Progress::Canceled => CANCELED_CODE,
        }
    }
}

/// Numeric range progress values are mapped onto before reaching a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressRange {
    floor: f64,
    ceiling: f64,
}

impl Default for ProgressRange {
    fn default() -> Self {
        Self {
            floor: 0.0,
            ceiling: 100.0,
        }
    }
}

impl ProgressRange {
    pub fn new(floor: f64, ceiling: f64) -> Result<Self, TaskError> {
        if !floor.is_finite() || !ceiling.is_finite() {
            return Err(TaskError::InvalidConfig(format!(
                "progress range bounds must be finite (got {}..{})",
                floor, ceiling
            )));
        }
        if floor > ceiling {
            return Err(TaskError::InvalidConfig(format!(
                "progress range floor {} is above ceiling {}",
                floor, ceiling
            )));
        }
        Ok(Self { floor, ceiling })
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Clamp into `[floor, ceiling]`. NaN maps to the floor.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            self.floor
        } else {
            value.max(self.floor).min(self.ceiling)
        }
    }

    /// Position of step `index` out of `step_count`, clamped into the range.
    pub fn normalize(&self, index: usize, step_count: usize) -> f64 {
        if step_count == 0 {
            return self.floor;
        }
        let fraction = index as f64 / step_count as f64;
        self.clamp(self.floor + (self.ceiling - self.floor) * fraction)
    }
}
