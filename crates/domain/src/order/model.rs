//! The order document and the payload used to place it.

use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::value_objects::validate_cart;
use super::{Address, CardDetails, CartItem, Money};

/// Payload of a new-order request.
///
/// Carries no order ID; one is assigned when the order is placed. The owner
/// may come from the body or from the request path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    #[serde(rename = "userid", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub delivery: String,
    pub card: CardDetails,
    #[serde(default)]
    pub cart: Vec<CartItem>,
    pub total: String,
}

impl NewOrder {
    /// Sets the owner, replacing any owner given in the body.
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Checks that the payload describes a placeable order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.user_id {
            Some(user_id) if !user_id.is_blank() => {}
            _ => return Err(ValidationError::MissingUserId),
        }

        let total = Money::parse("total", &self.total)?;
        if !total.is_positive() {
            return Err(ValidationError::InvalidAmount {
                field: "total",
                value: self.total.clone(),
            });
        }

        validate_cart(&self.cart)?;
        self.card.validate()
    }

    /// Splits the payload into the order document to persist and the card,
    /// which only travels on to the payment request.
    pub fn into_order(self, order_id: OrderId) -> (Order, CardDetails) {
        let order = Order {
            order_id,
            user_id: self.user_id.unwrap_or_default(),
            firstname: self.firstname,
            lastname: self.lastname,
            email: self.email,
            address: self.address,
            delivery: self.delivery,
            cart: self.cart,
            total: self.total,
        };
        (order, self.card)
    }
}

/// An order as recorded by the service.
///
/// Everything here is fixed at creation. The lifecycle status is kept by the
/// store alongside the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id", default)]
    pub order_id: OrderId,
    #[serde(rename = "userid", default)]
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub delivery: String,
    #[serde(default)]
    pub cart: Vec<CartItem>,
    #[serde(default)]
    pub total: String,
}

/// Response returned synchronously when an order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusView {
    pub order_id: OrderId,
    #[serde(rename = "userid")]
    pub user_id: UserId,
    pub payment: PaymentStatusView,
}

/// Payment part of [`OrderStatusView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusView {
    pub message: String,
    pub success: bool,
}

impl OrderStatusView {
    /// Payment is asynchronous, so a freshly placed order always reports
    /// "pending payment".
    pub fn pending_payment(order_id: OrderId, user_id: UserId) -> Self {
        Self {
            order_id,
            user_id,
            payment: PaymentStatusView {
                message: "pending payment".to_string(),
                success: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_order_json() -> serde_json::Value {
        serde_json::json!({
            "userid": "u1",
            "firstname": "Ada",
            "address": {"street": "1 Main St", "city": "Springfield", "zip": "12345"},
            "delivery": "UPS/FedEx",
            "card": {
                "type": "Visa",
                "number": "4222222222222",
                "expiryMonth": 12,
                "expiryYear": 2030,
                "cvv": "123"
            },
            "cart": [{"id": "A1", "description": "Yoga mat", "quantity": "1", "price": "42.00"}],
            "total": "42.00"
        })
    }

    #[test]
    fn decodes_and_validates_new_order() {
        let order: NewOrder = serde_json::from_value(new_order_json()).unwrap();
        assert!(order.validate().is_ok());
        assert_eq!(order.user_id, Some(UserId::new("u1")));
    }

    #[test]
    fn path_user_overrides_body_user() {
        let order: NewOrder = serde_json::from_value(new_order_json()).unwrap();
        let order = order.with_user(UserId::new("u2"));
        assert_eq!(order.user_id, Some(UserId::new("u2")));
    }

    #[test]
    fn missing_user_is_rejected() {
        let mut json = new_order_json();
        json.as_object_mut().unwrap().remove("userid");
        let order: NewOrder = serde_json::from_value(json).unwrap();
        assert_eq!(order.validate(), Err(ValidationError::MissingUserId));
    }

    #[test]
    fn zero_total_is_rejected() {
        let mut json = new_order_json();
        json["total"] = serde_json::json!("0.00");
        let order: NewOrder = serde_json::from_value(json).unwrap();
        assert!(matches!(
            order.validate(),
            Err(ValidationError::InvalidAmount { field: "total", .. })
        ));
    }

    #[test]
    fn into_order_drops_the_card() {
        let new_order: NewOrder = serde_json::from_value(new_order_json()).unwrap();
        let order_id = OrderId::generate();
        let (order, card) = new_order.into_order(order_id.clone());

        assert_eq!(order.order_id, order_id);
        assert_eq!(order.total, "42.00");
        assert_eq!(card.number, "4222222222222");

        let stored = serde_json::to_string(&order).unwrap();
        assert!(!stored.contains("4222222222222"));
        assert!(!stored.contains("card"));
    }

    #[test]
    fn order_uses_original_wire_names() {
        let new_order: NewOrder = serde_json::from_value(new_order_json()).unwrap();
        let (order, _) = new_order.into_order(OrderId::new("o-1"));
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["_id"], "o-1");
        assert_eq!(json["userid"], "u1");
        assert_eq!(json["cart"][0]["quantity"], 1);
    }

    #[test]
    fn status_view_shape() {
        let view = OrderStatusView::pending_payment(OrderId::new("o-1"), UserId::new("u1"));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "order_id": "o-1",
                "userid": "u1",
                "payment": {"message": "pending payment", "success": false}
            })
        );
    }
}
