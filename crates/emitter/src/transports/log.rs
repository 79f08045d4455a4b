use async_trait::async_trait;
use domain::{EventData, PaymentRequested, ShipmentRequested};

use crate::{OutboundMessage, Result, Transport};

/// Logs every event and drops it. Used for local runs without downstream
/// services.
///
/// Only a summary is logged. Card details go through the masking `Debug` of
/// `CardDetails`; the raw payload never reaches the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl LogTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, message: OutboundMessage) -> Result<()> {
        if message.event_type == PaymentRequested::EVENT_TYPE {
            if let Ok(event) = message.decode::<PaymentRequested>() {
                tracing::info!(
                    event_type = %message.event_type,
                    source = %message.source,
                    order_id = %event.data.order_id,
                    total = %event.data.total,
                    card = ?event.data.card,
                    "event emitted"
                );
                return Ok(());
            }
        } else if message.event_type == ShipmentRequested::EVENT_TYPE {
            if let Ok(event) = message.decode::<ShipmentRequested>() {
                tracing::info!(
                    event_type = %message.event_type,
                    source = %message.source,
                    order_id = %event.data.order_id,
                    delivery = %event.data.delivery,
                    "event emitted"
                );
                return Ok(());
            }
        }

        tracing::info!(
            event_type = %message.event_type,
            source = %message.source,
            payload_bytes = message.payload.len(),
            "event emitted"
        );
        Ok(())
    }
}
