//! Shutdown coordination.

use std::sync::Arc;

use tokio::sync::watch;

/// Coordinator for graceful shutdown.
///
/// Backed by a watch channel, so a task that subscribes after the trigger
/// still observes it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolves once shutdown is triggered.
    ///
    /// Never resolves if every coordinator is dropped without triggering.
    pub async fn recv(&mut self) {
        if self.rx.wait_for(|triggered| *triggered).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn late_subscriber_sees_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let mut signal = shutdown.subscribe();
        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .unwrap();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn pending_until_triggered() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();

        let early = tokio::time::timeout(Duration::from_millis(20), signal.recv()).await;
        assert!(early.is_err());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .unwrap();
    }
}
