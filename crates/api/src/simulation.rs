//! In-process stand-ins for the payment and shipment services.
//!
//! Reads the requests this service emits, answers them with the simulated
//! services and feeds the answers back into the inbound consumer.

use domain::{EventData, PaymentRequested, ShipmentRequested};
use emitter::OutboundMessage;
use saga::{SimulatedPaymentService, SimulatedShippingService};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Where emitted requests are read from.
pub enum OutboundFeed {
    Queue(mpsc::Receiver<OutboundMessage>),
    Bus(broadcast::Receiver<OutboundMessage>),
}

impl OutboundFeed {
    async fn recv(&mut self) -> Option<OutboundMessage> {
        match self {
            OutboundFeed::Queue(rx) => rx.recv().await,
            OutboundFeed::Bus(rx) => loop {
                match rx.recv().await {
                    Ok(message) => return Some(message),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "simulated services fell behind the bus");
                    }
                    Err(RecvError::Closed) => return None,
                }
            },
        }
    }
}

/// The simulated downstream services.
#[derive(Debug, Clone, Default)]
pub struct SimulatedServices {
    pub payment: SimulatedPaymentService,
    pub shipping: SimulatedShippingService,
}

impl SimulatedServices {
    /// Produces the encoded reply to an emitted request, if there is one.
    pub fn respond(&self, message: &OutboundMessage) -> Option<Vec<u8>> {
        let reply = if message.event_type == PaymentRequested::EVENT_TYPE {
            message
                .decode::<PaymentRequested>()
                .map(|request| self.payment.validate(&request.data).to_bytes())
                .map(Some)
        } else if message.event_type == ShipmentRequested::EVENT_TYPE {
            message
                .decode::<ShipmentRequested>()
                .map(|request| self.shipping.ship(&request.data).map(|e| e.to_bytes()))
        } else {
            return None;
        };

        match reply {
            Ok(Some(Ok(bytes))) => Some(bytes),
            Ok(None) => None,
            Ok(Some(Err(e))) => {
                tracing::error!(error = %e, "could not encode simulated reply");
                None
            }
            Err(e) => {
                tracing::error!(
                    event_type = %message.event_type,
                    error = %e,
                    "simulated services could not decode request"
                );
                None
            }
        }
    }

    /// Answers every request from `feed` until it closes.
    pub fn spawn(self, mut feed: OutboundFeed, inbound: mpsc::Sender<Vec<u8>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(message) = feed.recv().await {
                let Some(reply) = self.respond(&message) else {
                    continue;
                };
                if inbound.send(reply).await.is_err() {
                    tracing::warn!("inbound consumer gone, stopping simulated services");
                    break;
                }
            }
        })
    }
}
