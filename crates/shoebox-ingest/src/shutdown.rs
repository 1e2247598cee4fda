//! Cooperative shutdown flag shared across pipeline components.
//!
//! Built on a `tokio::watch` channel so synchronous code can poll the flag
//! while async code awaits the transition.

use std::sync::Arc;

use tokio::sync::watch;

/// Clonable shutdown flag. Once triggered it never resets.
#[derive(Clone)]
pub struct StopFlag {
    sender: Arc<watch::Sender<bool>>,
}

impl StopFlag {
    /// Create a flag in the running (not triggered) state.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        let _previous = self.sender.send_replace(true);
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Wait until shutdown is requested.
    pub async fn triggered(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives inside this flag, so the channel cannot close
        // while we hold `&self`.
        let _ = receiver.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_is_observable_from_clones() {
        let flag = StopFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_triggered());

        flag.trigger();
        assert!(clone.is_triggered());
        clone.triggered().await;
    }
}
