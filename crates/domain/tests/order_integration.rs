//! Integration tests for the order wire contracts.
//!
//! These tests decode payloads shaped like the ones the payment and shipment
//! services exchange and walk an order through its lifecycle statuses.

use common::{OrderId, UserId};
use domain::{
    CreditCardValidated, Envelope, EventData, InboundEvent, NewOrder, OrderStatus,
    PaymentRequested, ShipmentRequested, ValidationError,
};

fn new_order_body() -> serde_json::Value {
    serde_json::json!({
        "userid": "8888",
        "firstname": "John",
        "lastname": "Blaze",
        "email": "john@example.com",
        "address": {
            "street": "20 Riding Lane Av",
            "city": "San Francisco",
            "zip": "10201",
            "state": "CA",
            "country": "USA"
        },
        "delivery": "UPS/FedEx",
        "card": {
            "type": "Visa",
            "number": "4222222222222",
            "expiryYear": 2030,
            "expiryMonth": 12,
            "cvv": "123"
        },
        "cart": [
            { "id": "sdfsdfsfs", "description": "Weights for your metal cars", "quantity": "1", "price": "34.99" },
            { "id": "sdfsdfsfs2", "description": "Spare wheels", "quantity": 2, "price": "5.00" }
        ],
        "total": "44.99"
    })
}

mod order_placement {
    use super::*;

    #[test]
    fn new_order_becomes_payment_request_without_storing_card() {
        let new_order: NewOrder = serde_json::from_value(new_order_body()).unwrap();
        new_order.validate().unwrap();

        let (order, card) = new_order.into_order(OrderId::new("o-1"));
        assert_eq!(order.user_id, UserId::new("8888"));
        assert_eq!(order.cart[1].quantity, 2);

        let stored = serde_json::to_value(&order).unwrap();
        assert!(stored.get("card").is_none());
        assert_eq!(stored["_id"], "o-1");

        let request = Envelope::new(
            "AddOrder",
            PaymentRequested {
                order_id: order.order_id.clone(),
                card,
                total: order.total.clone(),
            },
        );
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["metadata"]["domain"], "Order");
        assert_eq!(wire["metadata"]["source"], "AddOrder");
        assert_eq!(wire["metadata"]["type"], PaymentRequested::EVENT_TYPE);
        assert_eq!(wire["metadata"]["status"], "success");
        assert_eq!(wire["data"]["orderID"], "o-1");
        assert_eq!(wire["data"]["card"]["number"], "4222222222222");
        assert_eq!(wire["data"]["total"], "44.99");
    }

    #[test]
    fn malformed_orders_are_rejected() {
        let mut body = new_order_body();
        body["total"] = serde_json::json!("forty");
        let new_order: NewOrder = serde_json::from_value(body).unwrap();
        assert!(matches!(
            new_order.validate(),
            Err(ValidationError::InvalidAmount { field: "total", .. })
        ));

        let mut body = new_order_body();
        body["cart"][0]["quantity"] = serde_json::json!(0);
        let new_order: NewOrder = serde_json::from_value(body).unwrap();
        assert!(matches!(
            new_order.validate(),
            Err(ValidationError::InvalidCartItem { index: 0, .. })
        ));
    }

    #[test]
    fn shipment_request_carries_delivery() {
        let request = Envelope::new(
            "ShipOrder",
            ShipmentRequested {
                order_id: OrderId::new("o-1"),
                delivery: "UPS/FedEx".to_string(),
            },
        );
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["metadata"]["type"], "ShipmentRequested");
        assert_eq!(wire["data"]["orderID"], "o-1");
        assert_eq!(wire["data"]["delivery"], "UPS/FedEx");
    }
}

mod inbound_events {
    use super::*;

    #[test]
    fn payment_outcome_drives_status() {
        let body = serde_json::json!({
            "metadata": { "domain": "Payment", "source": "ValidateCreditCard", "type": "CreditCardValidated", "status": "success" },
            "data": { "success": "true", "status": 200, "message": "transaction successful", "amount": "44.99", "transactionID": "3f846704-af12-4907-a2fd-0b4ad4f5ab9f", "orderID": "o-1" }
        });

        let event = InboundEvent::from_slice(body.to_string().as_bytes());
        // `success` must be a JSON boolean
        assert!(event.is_err());

        let mut body = body;
        body["data"]["success"] = serde_json::json!(true);
        let event = InboundEvent::from_slice(body.to_string().as_bytes()).unwrap();
        assert_eq!(event.order_id(), &OrderId::new("o-1"));

        let InboundEvent::PaymentValidated(envelope) = event else {
            panic!("expected a payment outcome");
        };
        let outcome: CreditCardValidated = envelope.data;
        assert_eq!(outcome.target_status(), OrderStatus::PendingShipment);
        assert!(OrderStatus::PendingPayment.can_transition_to(outcome.target_status()));
    }

    #[test]
    fn shipment_updates_walk_to_delivered() {
        let mut status = OrderStatus::PendingShipment;

        for reported in ["Shipped", "delivered"] {
            let body = serde_json::json!({
                "metadata": { "domain": "Shipment", "source": "SendShipment", "type": "SentShipment", "status": "success" },
                "data": { "trackingNumber": "TRK-1", "orderNumber": "o-1", "status": reported }
            });
            let InboundEvent::ShipmentStatus(envelope) =
                InboundEvent::from_slice(body.to_string().as_bytes()).unwrap()
            else {
                panic!("expected a shipment update");
            };

            let target = envelope.data.target_status().unwrap();
            assert!(status.can_transition_to(target));
            status = target;
        }

        assert_eq!(status, OrderStatus::Delivered);
        assert!(status.is_terminal());
        assert!(status.has_reached(OrderStatus::Shipped));
    }

    #[test]
    fn unknown_event_types_are_rejected() {
        let body = serde_json::json!({
            "metadata": { "domain": "Payment", "source": "x", "type": "PaymentRefunded", "status": "success" },
            "data": {}
        });

        assert!(matches!(
            InboundEvent::from_slice(body.to_string().as_bytes()),
            Err(ValidationError::UnsupportedEventType(t)) if t == "PaymentRefunded"
        ));
    }
}
