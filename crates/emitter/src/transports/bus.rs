use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{OutboundMessage, Result, Transport};

/// Publish/subscribe bus transport.
///
/// Every subscriber receives every message. Publishing with no subscribers
/// succeeds; the message is dropped like an event bus with no matching rule.
#[derive(Debug, Clone)]
pub struct BusTransport {
    sender: broadcast::Sender<OutboundMessage>,
}

impl BusTransport {
    /// Creates a bus that buffers up to `capacity` messages per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to all messages published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl Transport for BusTransport {
    fn name(&self) -> &'static str {
        "bus"
    }

    async fn deliver(&self, message: OutboundMessage) -> Result<()> {
        let event_type = message.event_type.clone();
        if self.sender.send(message).is_err() {
            tracing::debug!(event_type = %event_type, "no bus subscribers, event dropped");
        }
        Ok(())
    }
}
