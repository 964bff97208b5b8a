//! One-shot cancellation flag shared between a caller and a running task.

use tokio_util::sync::CancellationToken;

/// Cloneable handle to a cancellation request. Once set it stays set.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    token: CancellationToken,
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. Calling this again, or after the run has
    /// finished, does nothing.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("cancellation requested");
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Free-function form of [`CancellationSignal::cancel`].
pub fn cancel(signal: &CancellationSignal) {
    signal.cancel();
}
