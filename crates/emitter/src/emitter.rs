use async_trait::async_trait;
use domain::{Envelope, EventData, PaymentRequested, ShipmentRequested, ValidationError};

use crate::Result;

/// An encoded event ready to be handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Value of `metadata.type`.
    pub event_type: String,
    /// Value of `metadata.source`.
    pub source: String,
    /// JSON-encoded envelope.
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    /// Encodes an envelope.
    pub fn encode<T: EventData>(event: &Envelope<T>) -> Result<Self> {
        Ok(Self {
            event_type: event.metadata.event_type.clone(),
            source: event.metadata.source.clone(),
            payload: event.to_bytes()?,
        })
    }

    /// Decodes the payload back into an envelope.
    pub fn decode<T: EventData>(&self) -> std::result::Result<Envelope<T>, ValidationError> {
        Envelope::from_slice(&self.payload)
    }

    /// Returns the payload as text.
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// A channel that carries encoded events to the payment and shipment
/// services.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Hands one message over. Returns once the transport has accepted it.
    async fn deliver(&self, message: OutboundMessage) -> Result<()>;
}

/// Publishes the events produced by the order saga.
#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Publishes a payment request.
    async fn send_payment_requested(&self, event: &Envelope<PaymentRequested>) -> Result<()>;

    /// Publishes a shipment request.
    async fn send_shipment_requested(&self, event: &Envelope<ShipmentRequested>) -> Result<()>;
}

// Blanket implementation for all transports
#[async_trait]
impl<T: Transport + ?Sized> EventEmitter for T {
    async fn send_payment_requested(&self, event: &Envelope<PaymentRequested>) -> Result<()> {
        publish(self, event).await
    }

    async fn send_shipment_requested(&self, event: &Envelope<ShipmentRequested>) -> Result<()> {
        publish(self, event).await
    }
}

async fn publish<T, E>(transport: &T, event: &Envelope<E>) -> Result<()>
where
    T: Transport + ?Sized,
    E: EventData + Sync,
{
    let message = OutboundMessage::encode(event)?;
    let event_type = message.event_type.clone();

    transport.deliver(message).await?;

    tracing::debug!(
        event_type = %event_type,
        transport = transport.name(),
        "event published"
    );
    metrics::counter!(
        "order_events_published_total",
        "type" => event_type,
        "transport" => transport.name()
    )
    .increment(1);
    Ok(())
}

/// Which transport carries outbound events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Log events and drop them.
    #[default]
    Log,
    /// Point-to-point queue.
    Queue,
    /// Publish/subscribe bus.
    Bus,
    /// HTTP POST to the downstream services.
    Http,
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" | "mock" => Ok(TransportKind::Log),
            "queue" => Ok(TransportKind::Queue),
            "bus" => Ok(TransportKind::Bus),
            "http" => Ok(TransportKind::Http),
            other => Err(format!("unknown event transport: {other}")),
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransportKind::Log => "log",
            TransportKind::Queue => "queue",
            TransportKind::Bus => "bus",
            TransportKind::Http => "http",
        };
        write!(f, "{name}")
    }
}
