use super::types::Progress;
use tokio::sync::mpsc;

/// Receives progress notifications from the worker thread.
///
/// Implementations are called on the worker, in iteration order. A sink that
/// feeds a single-threaded event loop should forward rather than touch that
/// loop's state directly; [`channel_sink`] does this.
pub trait ProgressSink: Send + 'static {
    fn report(&mut self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: FnMut(Progress) + Send + 'static,
{
    fn report(&mut self, progress: Progress) {
        self(progress)
    }
}

/// Sink that forwards every notification over an unbounded channel.
///
/// The worker never blocks on the channel. Once the receiver is dropped,
/// notifications are discarded and the run carries on.
#[derive(Debug, Clone)]
pub struct ChannelSink(mpsc::UnboundedSender<Progress>);

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Progress>) -> Self {
        Self(tx)
    }
}

impl ProgressSink for ChannelSink {
    fn report(&mut self, progress: Progress) {
        if self.0.send(progress).is_err() {
            tracing::trace!(?progress, "progress receiver gone, dropping notification");
        }
    }
}

/// Sink/receiver pair for marshaling progress onto the caller's event loop.
pub fn channel_sink() -> (ChannelSink, mpsc::UnboundedReceiver<Progress>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink(tx), rx)
}
