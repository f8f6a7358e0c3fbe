//! The report publishing seam.
//!
//! The worker never talks to a transport directly; it is handed a
//! [`ReportPublisher`] at construction. The process-wide broker the service
//! is deployed against lives behind this trait — in-process consumers (tests,
//! the demo binary) use the broadcast-channel implementation shipped here.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::TrackerError;

/// Sink for serialized track reports.
#[async_trait]
pub trait ReportPublisher: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Publish one serialized report. A failure is logged by the caller and
    /// the tick proceeds; there is no retry queue.
    async fn publish(&self, payload: String) -> Result<(), TrackerError>;
}

/// In-process publisher fanning reports out over a tokio broadcast channel.
pub struct BroadcastPublisher {
    tx: broadcast::Sender<String>,
}

impl BroadcastPublisher {
    /// Create a publisher with its own channel of the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Wrap an existing channel.
    pub fn from_sender(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }

    /// Get a receiver for published reports.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl ReportPublisher for BroadcastPublisher {
    fn name(&self) -> &str {
        "broadcast"
    }

    async fn publish(&self, payload: String) -> Result<(), TrackerError> {
        // No subscribers is not a failure; the report is simply unobserved.
        let _ = self.tx.send(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let publisher = BroadcastPublisher::new(8);
        let mut rx = publisher.subscribe();

        publisher.publish("{\"tracks\":[]}".to_string()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), "{\"tracks\":[]}");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let publisher = BroadcastPublisher::new(8);
        assert!(publisher.publish("x".to_string()).await.is_ok());
        assert_eq!(publisher.subscriber_count(), 0);
    }
}
