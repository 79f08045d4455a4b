//! Simulated shipping service.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use domain::{Envelope, EventData, Metadata, OrderStatus, ShipmentRequested, ShipmentStatusUpdate};

/// Answers shipment requests with a `Shipped` update carrying a tracking
/// number.
#[derive(Debug, Clone, Default)]
pub struct SimulatedShippingService {
    next_id: Arc<AtomicU32>,
    fail_on_create: Arc<AtomicBool>,
}

impl SimulatedShippingService {
    /// Creates a new simulated shipping service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to ignore subsequent shipment requests.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.fail_on_create.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of shipments created.
    pub fn shipment_count(&self) -> u32 {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Ships an order. Returns `None` when configured to fail.
    pub fn ship(&self, request: &ShipmentRequested) -> Option<Envelope<ShipmentStatusUpdate>> {
        if self.fail_on_create.load(Ordering::SeqCst) {
            tracing::warn!(order_id = %request.order_id, "simulated shipping unavailable");
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Some(Envelope {
            metadata: Metadata {
                domain: "Shipment".to_string(),
                source: "SendShipment".to_string(),
                event_type: ShipmentStatusUpdate::EVENT_TYPE.to_string(),
                status: "success".to_string(),
            },
            data: ShipmentStatusUpdate {
                order_number: request.order_id.clone(),
                status: OrderStatus::Shipped.to_string(),
                tracking_number: format!("TRK-{id:04}"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;

    fn request() -> ShipmentRequested {
        ShipmentRequested {
            order_id: OrderId::new("o-1"),
            delivery: "UPS/FedEx".to_string(),
        }
    }

    #[test]
    fn ships_with_sequential_tracking_numbers() {
        let service = SimulatedShippingService::new();

        let first = service.ship(&request()).unwrap();
        let second = service.ship(&request()).unwrap();

        assert_eq!(first.data.status, "Shipped");
        assert_eq!(first.data.tracking_number, "TRK-0001");
        assert_eq!(second.data.tracking_number, "TRK-0002");
        assert_eq!(service.shipment_count(), 2);
    }

    #[test]
    fn fail_on_create() {
        let service = SimulatedShippingService::new();
        service.set_fail_on_create(true);

        assert!(service.ship(&request()).is_none());
        assert_eq!(service.shipment_count(), 0);
    }
}
