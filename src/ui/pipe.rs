use crate::event::Event;
use crate::state::DisplayState;
use crate::task::{CancellationSignal, Outcome, Progress};
use serde_json::json;
use std::io::{self, Write};
use tokio::sync::mpsc;

/// Knobs for the line-oriented front-end.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipeOptions {
    /// Emit one JSON object per line instead of plain text.
    pub json: bool,
    /// Request cancellation once this step index has been shown.
    pub cancel_after: Option<usize>,
}

/// Display run events in pipe mode (stdout only, for scripting).
///
/// A cancellation requested elsewhere (Ctrl-C, a timed-out wait) is shown as
/// soon as it happens, not when the run next reports.
///
/// Returns the terminal outcome, or `None` if the channel closed first.
pub async fn display_progress_pipe<W: Write>(
    mut rx: mpsc::UnboundedReceiver<Event>,
    signal: &CancellationSignal,
    state: &mut DisplayState,
    opts: PipeOptions,
    out: &mut W,
) -> io::Result<Option<Outcome>> {
    let mut cancel_noted = false;
    loop {
        let event = tokio::select! {
            biased;
            event = rx.recv() => event,
            _ = signal.cancelled(), if !cancel_noted => {
                cancel_noted = true;
                if let Some(msg) = state.request_cancel() {
                    write_status(out, opts.json, &msg)?;
                    out.flush()?;
                }
                continue;
            }
        };
        let Some(event) = event else { break };

        match event {
            Event::Progress(progress) => {
                if let Some(msg) = state.apply_progress(progress) {
                    write_status(out, opts.json, &msg)?;
                }
                if progress.is_terminal() {
                    cancel_noted = true;
                }
                if let Progress::Step { index, value } = progress {
                    write_step(out, opts.json, index, value)?;
                    if opts.cancel_after.is_some_and(|k| index >= k)
                        && state.abort_allowed
                        && !cancel_noted
                    {
                        signal.cancel();
                        cancel_noted = true;
                        if let Some(msg) = state.request_cancel() {
                            write_status(out, opts.json, &msg)?;
                        }
                    }
                }
            }
            Event::Finished(outcome) => {
                state.apply_outcome(&outcome);
                write_outcome(out, opts.json, &outcome, &state.status)?;
                out.flush()?;
                return Ok(Some(outcome));
            }
        }
    }
    out.flush()?;
    Ok(None)
}

fn write_status<W: Write>(out: &mut W, json: bool, msg: &str) -> io::Result<()> {
    if json {
        writeln!(out, "{}", json!({ "kind": "status", "status": msg }))
    } else {
        writeln!(out, "{}", msg)
    }
}

fn write_step<W: Write>(out: &mut W, json: bool, index: usize, value: f64) -> io::Result<()> {
    if json {
        writeln!(out, "{}", json!({ "kind": "step", "index": index, "value": value }))
    } else {
        writeln!(out, "[{:>3.0}%] step {}", value, index)
    }
}

fn write_outcome<W: Write>(out: &mut W, json: bool, outcome: &Outcome, status: &str) -> io::Result<()> {
    if json {
        let error = outcome.error().map(|e| e.to_string());
        writeln!(
            out,
            "{}",
            json!({ "kind": "outcome", "outcome": outcome_tag(outcome), "status": status, "error": error })
        )
    } else {
        writeln!(out, "{}", status)
    }
}

fn outcome_tag(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Completed => "completed",
        Outcome::Canceled => "canceled",
        Outcome::Failed(_) => "failed",
    }
}
