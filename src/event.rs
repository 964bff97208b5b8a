use crate::task::{Outcome, Progress, ProgressSink};
use tokio::sync::mpsc;

/// Everything the front-end loop hears about a run, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Progress(Progress),
    Finished(Outcome),
}

/// Build the progress sink and outcome handler for one run, both feeding the
/// same channel so the front-end sees the outcome strictly after the last
/// notification.
pub fn forwarders(
    tx: mpsc::UnboundedSender<Event>,
) -> (impl ProgressSink, impl FnOnce(&Outcome) + Send + 'static) {
    let progress_tx = tx.clone();
    let sink = move |progress: Progress| {
        let _ = progress_tx.send(Event::Progress(progress));
    };
    let on_outcome = move |outcome: &Outcome| {
        let _ = tx.send(Event::Finished(outcome.clone()));
    };
    (sink, on_outcome)
}
