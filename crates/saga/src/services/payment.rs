//! Simulated payment service.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use domain::{CreditCardValidated, Envelope, EventData, Metadata, PaymentRequested};

/// Answers payment requests with card validation outcomes.
///
/// Approves every card that passes the Luhn check unless configured to fail.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPaymentService {
    next_id: Arc<AtomicU32>,
    fail_on_charge: Arc<AtomicBool>,
}

impl SimulatedPaymentService {
    /// Creates a new simulated payment service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to decline every subsequent charge.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.fail_on_charge.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of approved charges.
    pub fn approved_count(&self) -> u32 {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Validates the card of a payment request.
    pub fn validate(&self, request: &PaymentRequested) -> Envelope<CreditCardValidated> {
        let data = if self.fail_on_charge.load(Ordering::SeqCst) {
            declined(request, "Payment declined")
        } else if !request.card.passes_luhn() {
            declined(request, "Invalid card number")
        } else {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            CreditCardValidated {
                order_id: request.order_id.clone(),
                success: true,
                status: Some(200),
                message: "transaction successful".to_string(),
                transaction_id: format!("PAY-{id:04}"),
                amount: Some(request.total.clone()),
            }
        };

        tracing::debug!(
            order_id = %request.order_id,
            card = ?request.card,
            success = data.success,
            "simulated card validation"
        );

        Envelope {
            metadata: Metadata {
                domain: "Payment".to_string(),
                source: "ValidateCreditCard".to_string(),
                event_type: CreditCardValidated::EVENT_TYPE.to_string(),
                status: "success".to_string(),
            },
            data,
        }
    }
}

fn declined(request: &PaymentRequested, message: &str) -> CreditCardValidated {
    CreditCardValidated {
        order_id: request.order_id.clone(),
        success: false,
        status: Some(400),
        message: message.to_string(),
        transaction_id: String::new(),
        amount: Some(request.total.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use domain::CardDetails;

    fn request(number: &str) -> PaymentRequested {
        PaymentRequested {
            order_id: OrderId::new("o-1"),
            card: CardDetails {
                card_type: "Visa".to_string(),
                number: number.to_string(),
                expiry_month: 12,
                expiry_year: 2030,
                cvv: "123".to_string(),
            },
            total: "42.00".to_string(),
        }
    }

    #[test]
    fn approves_valid_card() {
        let service = SimulatedPaymentService::new();
        let outcome = service.validate(&request("4222222222222"));

        assert_eq!(outcome.metadata.event_type, "CreditCardValidated");
        assert!(outcome.data.success);
        assert_eq!(outcome.data.transaction_id, "PAY-0001");
        assert_eq!(outcome.data.amount.as_deref(), Some("42.00"));
        assert_eq!(service.approved_count(), 1);
    }

    #[test]
    fn declines_card_failing_luhn() {
        let service = SimulatedPaymentService::new();
        let outcome = service.validate(&request("4222222222223"));

        assert!(!outcome.data.success);
        assert_eq!(outcome.data.message, "Invalid card number");
        assert_eq!(service.approved_count(), 0);
    }

    #[test]
    fn fail_on_charge() {
        let service = SimulatedPaymentService::new();
        service.set_fail_on_charge(true);

        let outcome = service.validate(&request("4222222222222"));
        assert!(!outcome.data.success);
        assert_eq!(outcome.data.message, "Payment declined");
    }
}
