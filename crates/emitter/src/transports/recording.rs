use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::{EmitError, OutboundMessage, Result, Transport};

/// In-memory transport for testing.
///
/// Keeps every delivered message and can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    messages: Arc<Mutex<Vec<OutboundMessage>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingTransport {
    /// Creates a new recording transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the transport to reject subsequent deliveries.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns every delivered message in order.
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.lock().clone()
    }

    /// Returns the delivered messages of one event type.
    pub fn messages_of_type(&self, event_type: &str) -> Vec<OutboundMessage> {
        self.lock()
            .iter()
            .filter(|m| m.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Returns the number of delivered messages.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Forgets all delivered messages.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<OutboundMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn deliver(&self, message: OutboundMessage) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmitError::Transport("simulated delivery failure".to_string()));
        }
        self.lock().push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventEmitter;
    use common::OrderId;
    use domain::{Envelope, ShipmentRequested};

    fn shipment(order_id: &str) -> Envelope<ShipmentRequested> {
        Envelope::new(
            "ShipOrder",
            ShipmentRequested {
                order_id: OrderId::new(order_id),
                delivery: "UPS/FedEx".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn records_delivered_messages() {
        let transport = RecordingTransport::new();
        transport
            .send_shipment_requested(&shipment("o-1"))
            .await
            .unwrap();
        transport
            .send_shipment_requested(&shipment("o-2"))
            .await
            .unwrap();

        assert_eq!(transport.count(), 2);
        assert_eq!(transport.messages_of_type("ShipmentRequested").len(), 2);
        assert!(transport.messages_of_type("PaymentRequested").is_empty());

        let first: Envelope<ShipmentRequested> = transport.messages()[0].decode().unwrap();
        assert_eq!(first.data.order_id, OrderId::new("o-1"));
    }

    #[tokio::test]
    async fn fails_on_demand() {
        let transport = RecordingTransport::new();
        transport.set_fail(true);

        let result = transport.send_shipment_requested(&shipment("o-1")).await;
        assert!(matches!(result, Err(EmitError::Transport(_))));
        assert_eq!(transport.count(), 0);
    }
}
