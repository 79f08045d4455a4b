use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{EmitError, OutboundMessage, Result, Transport};

/// Point-to-point queue transport.
///
/// Each message is received by exactly one consumer of the paired receiver.
#[derive(Debug, Clone)]
pub struct QueueTransport {
    sender: mpsc::Sender<OutboundMessage>,
}

impl QueueTransport {
    /// Creates a bounded queue and returns the transport with its receiving
    /// end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Transport for QueueTransport {
    fn name(&self) -> &'static str {
        "queue"
    }

    async fn deliver(&self, message: OutboundMessage) -> Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| EmitError::Closed)
    }
}
