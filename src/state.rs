// state.rs: caller-side display model fed by progress notifications and outcomes

use crate::task::{Outcome, Progress, ProgressRange};

/// What a front-end shows for the current (or last) run.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub range: ProgressRange,
    /// Bar value, always inside `range`.
    pub value: f64,
    pub status: String,
    pub busy: bool,
    pub abort_allowed: bool,
    pub version: u64, // Incremented on any state change
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::new(ProgressRange::default())
    }
}

impl DisplayState {
    pub fn new(range: ProgressRange) -> Self {
        Self {
            range,
            value: range.floor(),
            status: "Idle".to_string(),
            busy: false,
            abort_allowed: false,
            version: 0,
        }
    }

    /// Mark a run as started. Returns false while a previous run is still
    /// active, in which case nothing changes.
    pub fn try_begin(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        self.abort_allowed = false;
        self.value = self.range.floor();
        self.status = "Working".to_string();
        self.version += 1;
        true
    }

    pub fn set_value(&mut self, value: f64) {
        if self.store_value(value) {
            self.version += 1;
        }
    }

    /// Clamp and store a bar value without touching `version`. Returns
    /// whether the value moved.
    fn store_value(&mut self, value: f64) -> bool {
        let value = self.range.clamp(value);
        if (self.value - value).abs() > f64::EPSILON {
            self.value = value;
            true
        } else {
            false
        }
    }

    fn set_status(&mut self, status: &str) -> Option<String> {
        self.status = status.to_string();
        Some(self.status.clone())
    }

    /// Fold one notification in. Returns a status message when the
    /// notification marks a transition worth showing; that message also
    /// becomes `status`. `version` moves at most once per call.
    pub fn apply_progress(&mut self, progress: Progress) -> Option<String> {
        let shown = match progress {
            Progress::Canceled => {
                self.abort_allowed = false;
                self.set_status("Canceled")
            }
            Progress::Complete => {
                self.abort_allowed = false;
                self.store_value(self.range.ceiling());
                self.set_status("Complete")
            }
            Progress::Step { index, value } => {
                let moved = self.store_value(value);
                if index == 0 {
                    self.abort_allowed = true;
                    self.set_status("Starting")
                } else {
                    if moved {
                        self.version += 1;
                    }
                    return None;
                }
            }
        };
        self.version += 1;
        shown
    }

    /// Note that cancellation was requested while a run is active. Returns
    /// the status to show, or `None` when there is no run to cancel or the
    /// request was already noted.
    pub fn request_cancel(&mut self) -> Option<String> {
        const WAITING: &str = "Waiting to cancel...";
        if !self.busy || self.status == WAITING {
            return None;
        }
        self.abort_allowed = false;
        self.version += 1;
        self.set_status(WAITING)
    }

    /// Record the terminal outcome and release the busy flag.
    pub fn apply_outcome(&mut self, outcome: &Outcome) {
        self.busy = false;
        self.abort_allowed = false;
        self.status = match outcome {
            Outcome::Completed => "Done".to_string(),
            Outcome::Canceled => "Canceled".to_string(),
            Outcome::Failed(e) => format!("Failed: {}", e),
        };
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskError;

    #[test]
    fn begin_guards_against_reentry() {
        let mut state = DisplayState::default();
        assert!(state.try_begin());
        assert!(state.busy);
        assert_eq!(state.status, "Working");
        assert!(!state.try_begin());

        state.apply_outcome(&Outcome::Completed);
        assert!(!state.busy);
        assert!(state.try_begin());
    }

    #[test]
    fn step_zero_starts_and_allows_abort() {
        let mut state = DisplayState::default();
        state.try_begin();
        let msg = state.apply_progress(Progress::Step { index: 0, value: 0.0 });
        assert_eq!(msg.as_deref(), Some("Starting"));
        assert!(state.abort_allowed);

        assert_eq!(state.status, "Starting");

        assert_eq!(state.apply_progress(Progress::Step { index: 1, value: 1.0 }), None);
        assert_eq!(state.value, 1.0);
        assert_eq!(state.status, "Starting");
    }

    #[test]
    fn each_notification_bumps_version_once() {
        let mut state = DisplayState::default();
        state.try_begin();
        state.apply_progress(Progress::Step { index: 0, value: 0.0 });
        state.apply_progress(Progress::Step { index: 3, value: 30.0 });

        let before = state.version;
        state.apply_progress(Progress::Complete);
        assert_eq!(state.version, before + 1);
        assert_eq!(state.value, 100.0);
        assert_eq!(state.status, "Complete");

        let before = state.version;
        state.apply_progress(Progress::Step { index: 4, value: 100.0 });
        assert_eq!(state.version, before);
    }

    #[test]
    fn cancel_request_is_recorded_in_status() {
        let mut state = DisplayState::default();
        assert_eq!(state.request_cancel(), None);

        state.try_begin();
        state.apply_progress(Progress::Step { index: 0, value: 0.0 });
        let before = state.version;
        assert_eq!(state.request_cancel().as_deref(), Some("Waiting to cancel..."));
        assert_eq!(state.status, "Waiting to cancel...");
        assert!(!state.abort_allowed);
        assert_eq!(state.version, before + 1);

        assert_eq!(state.request_cancel(), None);
        assert_eq!(state.version, before + 1);

        state.apply_progress(Progress::Canceled);
        assert_eq!(state.status, "Canceled");
    }

    #[test]
    fn terminal_notifications_disable_abort() {
        let mut state = DisplayState::default();
        state.try_begin();
        state.apply_progress(Progress::Step { index: 0, value: 0.0 });
        assert_eq!(state.apply_progress(Progress::Complete).as_deref(), Some("Complete"));
        assert!(!state.abort_allowed);
        assert_eq!(state.value, 100.0);

        let mut state = DisplayState::default();
        state.try_begin();
        state.apply_progress(Progress::Step { index: 0, value: 0.0 });
        state.apply_progress(Progress::Step { index: 5, value: 50.0 });
        assert_eq!(state.apply_progress(Progress::Canceled).as_deref(), Some("Canceled"));
        assert!(!state.abort_allowed);
        assert_eq!(state.value, 50.0);
    }

    #[test]
    fn values_are_clamped_into_range() {
        let mut state = DisplayState::default();
        state.set_value(-2.0);
        assert_eq!(state.value, 0.0);
        state.set_value(140.0);
        assert_eq!(state.value, 100.0);
    }

    #[test]
    fn outcome_labels() {
        let mut state = DisplayState::default();
        state.try_begin();
        state.apply_outcome(&Outcome::Failed(TaskError::InjectedFailure {
            index: 41,
            threshold: 40,
        }));
        assert_eq!(state.status, "Failed: Step 41 exceeds failure threshold 40");
        assert!(!state.busy);

        state.try_begin();
        state.apply_outcome(&Outcome::Canceled);
        assert_eq!(state.status, "Canceled");
    }

    #[test]
    fn version_only_moves_forward_on_change() {
        let mut state = DisplayState::default();
        let v0 = state.version;
        state.set_value(0.0);
        assert_eq!(state.version, v0);
        state.set_value(10.0);
        assert!(state.version > v0);
    }
}
