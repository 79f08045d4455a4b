//! The order lifecycle state machine.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{OrderId, UserId};
use domain::{
    CardDetails, CreditCardValidated, Envelope, InboundEvent, NewOrder, OrderStatus,
    OrderStatusView, PaymentRequested, ShipmentRequested, ShipmentStatusUpdate,
};
use emitter::EventEmitter;
use order_store::{
    OrderRecord, OrderStore, OrderStoreExt, StatusChange, StoreError, UpdateOptions,
};

use crate::error::{CoordinatorError, Result};

/// `metadata.source` of the payment request emitted when an order is placed.
pub const SOURCE_ADD_ORDER: &str = "AddOrder";

/// `metadata.source` of the shipment request emitted after a successful payment.
pub const SOURCE_SHIP_ORDER: &str = "ShipOrder";

/// Bounds applied to every store and transport call.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub store_timeout: Duration,
    pub emit_timeout: Duration,
    /// How many times a status update is re-read and retried after losing a
    /// race with a concurrent update of the same order.
    pub max_update_attempts: u32,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            emit_timeout: Duration::from_secs(5),
            max_update_attempts: 3,
        }
    }
}

/// Result of applying an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The status was written. `from` equals `to` when only the shipment
    /// tracking number changed.
    Applied { from: OrderStatus, to: OrderStatus },
    /// The target status was already reached or superseded; nothing was
    /// written and nothing was emitted.
    AlreadyApplied { current: OrderStatus },
}

enum Transition {
    Applied {
        previous: OrderRecord,
        record: OrderRecord,
    },
    AlreadyApplied(OrderRecord),
}

/// Drives orders through the order → payment → shipment saga.
///
/// Holds owned handles to the store and the emitter; clones share them.
#[derive(Clone)]
pub struct OrderCoordinator {
    store: Arc<dyn OrderStore>,
    emitter: Arc<dyn EventEmitter>,
    options: CoordinatorOptions,
}

impl OrderCoordinator {
    /// Creates a coordinator with default timeouts.
    pub fn new(store: Arc<dyn OrderStore>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self::with_options(store, emitter, CoordinatorOptions::default())
    }

    /// Creates a coordinator with explicit timeouts and retry bounds.
    pub fn with_options(
        store: Arc<dyn OrderStore>,
        emitter: Arc<dyn EventEmitter>,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            store,
            emitter,
            options,
        }
    }

    /// Returns the configured options.
    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    /// Places a new order.
    ///
    /// The order is recorded as `PendingPayment` before the payment request
    /// is emitted; nothing is emitted if the write fails. If the payment
    /// request cannot be handed off, the order is marked
    /// `PaymentRequestFailed` and the emit error is returned.
    #[tracing::instrument(skip(self, new_order))]
    pub async fn place_order(&self, new_order: NewOrder) -> Result<OrderStatusView> {
        new_order.validate()?;

        let (order, card) = new_order.into_order(OrderId::generate());
        let record = self
            .write("create", self.store.create(order, OrderStatus::PendingPayment))
            .await?;

        let order_id = record.order_id().clone();
        let user_id = record.owner_id().clone();
        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(%order_id, %user_id, total = %record.order.total, "order placed");

        self.request_payment(&record, card).await?;

        Ok(OrderStatusView::pending_payment(order_id, user_id))
    }

    /// Re-sends the payment request of an order whose first request could
    /// not be handed off.
    #[tracing::instrument(skip(self, card))]
    pub async fn retry_payment_request(
        &self,
        order_id: &OrderId,
        card: CardDetails,
    ) -> Result<OrderStatusView> {
        card.validate()?;

        let current = self.read("get", self.store.get_required(order_id)).await?;
        if current.status != OrderStatus::PaymentRequestFailed {
            return Err(CoordinatorError::InvalidTransition {
                order_id: order_id.clone(),
                from: current.status,
                to: OrderStatus::PendingPayment,
            });
        }

        let record = match self
            .transition(
                order_id,
                StatusChange::to(OrderStatus::PendingPayment).replacing_details(),
            )
            .await?
        {
            Transition::Applied { record, .. } => record,
            // A concurrent retry got there first and owns the emission
            Transition::AlreadyApplied(record) => {
                return Ok(OrderStatusView::pending_payment(
                    record.order_id().clone(),
                    record.owner_id().clone(),
                ));
            }
        };

        tracing::info!(%order_id, "retrying payment request");
        self.request_payment(&record, card).await?;

        Ok(OrderStatusView::pending_payment(
            record.order_id().clone(),
            record.owner_id().clone(),
        ))
    }

    /// Applies a payment outcome.
    ///
    /// A successful payment moves the order to `PendingShipment` and emits a
    /// shipment request carrying the stored delivery details. A declined
    /// payment moves it to `PaymentFailed`. If the shipment request cannot be
    /// handed off, the status is put back so that redelivery of the same
    /// event re-runs the whole transition.
    #[tracing::instrument(skip(self, event), fields(order_id = %event.order_id, success = event.success))]
    pub async fn handle_payment_validated(
        &self,
        event: CreditCardValidated,
    ) -> Result<TransitionOutcome> {
        let target = event.target_status();
        let change = StatusChange::to(target)
            .with_message(event.message.clone())
            .with_transaction_id(event.transaction_id.clone());

        let (previous, record) = match self.transition(&event.order_id, change).await? {
            Transition::AlreadyApplied(record) => {
                return Ok(TransitionOutcome::AlreadyApplied {
                    current: record.status,
                });
            }
            Transition::Applied { previous, record } => (previous, record),
        };

        if target == OrderStatus::PendingShipment {
            let shipment = Envelope::new(
                SOURCE_SHIP_ORDER,
                ShipmentRequested {
                    order_id: record.order_id().clone(),
                    delivery: record.order.delivery.clone(),
                },
            );

            if let Err(e) = self
                .emit(
                    "ShipmentRequested",
                    self.emitter.send_shipment_requested(&shipment),
                )
                .await
            {
                tracing::error!(
                    order_id = %record.order_id(),
                    error = %e,
                    "shipment request not sent, reverting status"
                );
                self.revert(&record, &previous).await;
                return Err(e);
            }
            tracing::info!(order_id = %record.order_id(), "shipment requested");
        } else {
            tracing::warn!(
                order_id = %record.order_id(),
                message = %event.message,
                "payment declined"
            );
        }

        Ok(TransitionOutcome::Applied {
            from: previous.status,
            to: record.status,
        })
    }

    /// Applies a shipment status update. Nothing is emitted.
    ///
    /// A repeated update with an unchanged status but a new tracking number
    /// only refreshes the tracking number.
    #[tracing::instrument(skip(self, update), fields(order_id = %update.order_number, status = %update.status))]
    pub async fn handle_shipment_update(
        &self,
        update: ShipmentStatusUpdate,
    ) -> Result<TransitionOutcome> {
        let target = update.target_status()?;
        let change = StatusChange::to(target).with_tracking_number(update.tracking_number);

        match self.transition(&update.order_number, change).await? {
            Transition::AlreadyApplied(record) => Ok(TransitionOutcome::AlreadyApplied {
                current: record.status,
            }),
            Transition::Applied { previous, record } => {
                tracing::info!(
                    order_id = %record.order_id(),
                    status = %record.status,
                    tracking_number = record.tracking_number.as_deref().unwrap_or(""),
                    "shipment status updated"
                );
                Ok(TransitionOutcome::Applied {
                    from: previous.status,
                    to: record.status,
                })
            }
        }
    }

    /// Applies any inbound event.
    pub async fn handle_event(&self, event: InboundEvent) -> Result<TransitionOutcome> {
        match event {
            InboundEvent::PaymentValidated(envelope) => {
                self.handle_payment_validated(envelope.data).await
            }
            InboundEvent::ShipmentStatus(envelope) => {
                self.handle_shipment_update(envelope.data).await
            }
        }
    }

    /// Returns every order.
    pub async fn all_orders(&self) -> Result<Vec<OrderRecord>> {
        self.read("get_all", self.store.get_all()).await
    }

    /// Returns the orders owned by a user.
    pub async fn user_orders(&self, user_id: &UserId) -> Result<Vec<OrderRecord>> {
        self.read("get_by_user", self.store.get_by_user(user_id))
            .await
    }

    /// Returns a single order.
    pub async fn get_order(&self, order_id: &OrderId) -> Result<OrderRecord> {
        self.read("get", self.store.get_required(order_id)).await
    }

    /// Emits the payment request for a freshly written `PendingPayment`
    /// record, marking the order `PaymentRequestFailed` if that fails.
    async fn request_payment(&self, record: &OrderRecord, card: CardDetails) -> Result<()> {
        let event = Envelope::new(
            SOURCE_ADD_ORDER,
            PaymentRequested {
                order_id: record.order_id().clone(),
                card,
                total: record.order.total.clone(),
            },
        );

        if let Err(e) = self
            .emit(
                "PaymentRequested",
                self.emitter.send_payment_requested(&event),
            )
            .await
        {
            tracing::error!(
                order_id = %record.order_id(),
                error = %e,
                "payment request not sent, order needs a retry"
            );
            let change =
                StatusChange::to(OrderStatus::PaymentRequestFailed).with_message(e.to_string());
            if let Err(mark_err) = self
                .write(
                    "update_status",
                    self.store.update_status(
                        record.order_id(),
                        change,
                        UpdateOptions::expect_version(record.version),
                    ),
                )
                .await
            {
                tracing::error!(
                    order_id = %record.order_id(),
                    error = %mark_err,
                    "failed to mark order PaymentRequestFailed"
                );
            }
            return Err(e);
        }

        tracing::debug!(order_id = %record.order_id(), "payment requested");
        Ok(())
    }

    /// Guarded read-check-write of a status change.
    ///
    /// The write is conditional on the version that was read. Losing a race
    /// re-reads the order and re-checks the guard, so a duplicate event
    /// racing the original ends up as `AlreadyApplied`.
    async fn transition(&self, order_id: &OrderId, change: StatusChange) -> Result<Transition> {
        let target = change.status;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let current = self.read("get", self.store.get_required(order_id)).await?;

            if current.status.has_reached(target) {
                let new_tracking = change.tracking_number.is_some()
                    && current.status == target
                    && change.tracking_number != current.tracking_number;
                if !new_tracking {
                    metrics::counter!("order_events_duplicate_total", "status" => target.as_str())
                        .increment(1);
                    tracing::info!(
                        %order_id,
                        current = %current.status,
                        target = %target,
                        "target status already reached, skipping"
                    );
                    return Ok(Transition::AlreadyApplied(current));
                }
            } else if !current.status.can_transition_to(target) {
                tracing::warn!(
                    %order_id,
                    from = %current.status,
                    to = %target,
                    "transition not allowed"
                );
                return Err(CoordinatorError::InvalidTransition {
                    order_id: order_id.clone(),
                    from: current.status,
                    to: target,
                });
            }

            let result = self
                .write(
                    "update_status",
                    self.store.update_status(
                        order_id,
                        change.clone(),
                        UpdateOptions::expect_version(current.version),
                    ),
                )
                .await;

            match result {
                Ok(record) => {
                    metrics::counter!("order_transitions_total", "to" => target.as_str())
                        .increment(1);
                    tracing::debug!(%order_id, from = %current.status, to = %target, version = %record.version, "status updated");
                    return Ok(Transition::Applied {
                        previous: current,
                        record,
                    });
                }
                Err(CoordinatorError::StorageWrite(StoreError::ConcurrencyConflict { .. }))
                    if attempt < self.options.max_update_attempts =>
                {
                    tracing::debug!(%order_id, attempt, "concurrent update, re-reading order");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Compensating write that puts a record back to its previous status and
    /// detail fields.
    async fn revert(&self, record: &OrderRecord, previous: &OrderRecord) {
        let result = self
            .write(
                "update_status",
                self.store.update_status(
                    record.order_id(),
                    StatusChange::restoring(previous),
                    UpdateOptions::expect_version(record.version),
                ),
            )
            .await;

        if let Err(e) = result {
            tracing::error!(
                order_id = %record.order_id(),
                error = %e,
                "failed to revert status, order needs manual attention"
            );
        }
    }

    async fn read<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = order_store::Result<T>>,
    {
        self.timed_store_call(operation, call)
            .await?
            .map_err(CoordinatorError::from_read)
    }

    async fn write<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = order_store::Result<T>>,
    {
        self.timed_store_call(operation, call)
            .await?
            .map_err(CoordinatorError::from_write)
    }

    async fn timed_store_call<T, F>(
        &self,
        operation: &'static str,
        call: F,
    ) -> Result<order_store::Result<T>>
    where
        F: Future<Output = order_store::Result<T>>,
    {
        let start = Instant::now();
        let result = tokio::time::timeout(self.options.store_timeout, call).await;
        metrics::histogram!("order_store_operation_duration_seconds", "operation" => operation)
            .record(start.elapsed().as_secs_f64());

        result.map_err(|_| {
            tracing::warn!(operation, "order store call timed out");
            CoordinatorError::Timeout {
                operation,
                after: self.options.store_timeout,
            }
        })
    }

    async fn emit<F>(&self, event_type: &'static str, call: F) -> Result<()>
    where
        F: Future<Output = emitter::Result<()>>,
    {
        let result = match tokio::time::timeout(self.options.emit_timeout, call).await {
            Ok(result) => result.map_err(CoordinatorError::from),
            Err(_) => Err(CoordinatorError::Timeout {
                operation: event_type,
                after: self.options.emit_timeout,
            }),
        };

        if result.is_err() {
            metrics::counter!("order_emit_failures_total", "type" => event_type).increment(1);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CartItem, Order};
    use emitter::RecordingTransport;
    use order_store::InMemoryOrderStore;

    fn coordinator() -> (OrderCoordinator, InMemoryOrderStore, RecordingTransport) {
        let store = InMemoryOrderStore::new();
        let transport = RecordingTransport::new();
        let coordinator = OrderCoordinator::with_options(
            Arc::new(store.clone()),
            Arc::new(transport.clone()),
            CoordinatorOptions {
                store_timeout: Duration::from_millis(200),
                emit_timeout: Duration::from_millis(200),
                max_update_attempts: 3,
            },
        );
        (coordinator, store, transport)
    }

    fn card() -> CardDetails {
        CardDetails {
            card_type: "Visa".to_string(),
            number: "4222222222222".to_string(),
            expiry_month: 12,
            expiry_year: 2030,
            cvv: "123".to_string(),
        }
    }

    async fn stored_order(store: &InMemoryOrderStore, status: OrderStatus) -> OrderId {
        let order = Order {
            order_id: OrderId::new("o-1"),
            user_id: UserId::new("u1"),
            firstname: None,
            lastname: None,
            email: None,
            address: None,
            delivery: "UPS/FedEx".to_string(),
            cart: vec![CartItem::new("A1", "Yoga mat", 1, "42.00")],
            total: "42.00".to_string(),
        };
        store.create(order, status).await.unwrap().order_id().clone()
    }

    fn payment_outcome(order_id: &OrderId, success: bool) -> CreditCardValidated {
        CreditCardValidated {
            order_id: order_id.clone(),
            success,
            status: Some(if success { 200 } else { 400 }),
            message: if success { "ok" } else { "declined" }.to_string(),
            transaction_id: "tx-1".to_string(),
            amount: Some("42.00".to_string()),
        }
    }

    #[tokio::test]
    async fn declined_payment_after_shipment_requested_is_invalid() {
        let (coordinator, store, transport) = coordinator();
        let order_id = stored_order(&store, OrderStatus::PendingShipment).await;

        let result = coordinator
            .handle_payment_validated(payment_outcome(&order_id, false))
            .await;

        assert!(matches!(
            result,
            Err(CoordinatorError::InvalidTransition {
                from: OrderStatus::PendingShipment,
                to: OrderStatus::PaymentFailed,
                ..
            })
        ));
        assert_eq!(transport.count(), 0);
    }

    #[tokio::test]
    async fn late_payment_outcome_accepted_after_failed_request() {
        let (coordinator, store, transport) = coordinator();
        let order_id = stored_order(&store, OrderStatus::PaymentRequestFailed).await;

        let outcome = coordinator
            .handle_payment_validated(payment_outcome(&order_id, true))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TransitionOutcome::Applied {
                from: OrderStatus::PaymentRequestFailed,
                to: OrderStatus::PendingShipment
            }
        );
        assert_eq!(transport.messages_of_type("ShipmentRequested").len(), 1);
    }

    #[tokio::test]
    async fn shipment_emit_failure_reverts_status() {
        let (coordinator, store, transport) = coordinator();
        let order_id = stored_order(&store, OrderStatus::PendingPayment).await;
        transport.set_fail(true);

        let result = coordinator
            .handle_payment_validated(payment_outcome(&order_id, true))
            .await;
        assert!(matches!(result, Err(CoordinatorError::Emit(_))));
        let reverted = store.get_required(&order_id).await.unwrap();
        assert_eq!(reverted.status, OrderStatus::PendingPayment);
        assert!(reverted.transaction_id.is_none());
        assert!(reverted.status_message.is_none());
        assert!(reverted.tracking_number.is_none());

        // Redelivery after the transport recovers completes the transition
        transport.set_fail(false);
        coordinator
            .handle_payment_validated(payment_outcome(&order_id, true))
            .await
            .unwrap();
        assert_eq!(
            store.get_required(&order_id).await.unwrap().status,
            OrderStatus::PendingShipment
        );
        assert_eq!(transport.messages_of_type("ShipmentRequested").len(), 1);
    }

    #[tokio::test]
    async fn store_latency_beyond_timeout_is_retryable() {
        let (coordinator, store, _) = coordinator();
        let order_id = stored_order(&store, OrderStatus::PendingPayment).await;
        store.set_latency(Duration::from_secs(1));

        let result = coordinator.get_order(&order_id).await;
        match result {
            Err(e @ CoordinatorError::Timeout { .. }) => assert!(e.is_retryable()),
            other => panic!("Expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tracking_number_refresh_without_status_change() {
        let (coordinator, store, _) = coordinator();
        let order_id = stored_order(&store, OrderStatus::PendingShipment).await;

        let update = |tracking: &str| ShipmentStatusUpdate {
            order_number: order_id.clone(),
            status: "Shipped".to_string(),
            tracking_number: tracking.to_string(),
        };

        coordinator
            .handle_shipment_update(update("TRK-1"))
            .await
            .unwrap();
        assert_eq!(
            coordinator.handle_shipment_update(update("TRK-1")).await.unwrap(),
            TransitionOutcome::AlreadyApplied {
                current: OrderStatus::Shipped
            }
        );
        assert_eq!(
            coordinator.handle_shipment_update(update("TRK-2")).await.unwrap(),
            TransitionOutcome::Applied {
                from: OrderStatus::Shipped,
                to: OrderStatus::Shipped
            }
        );

        let record = store.get_required(&order_id).await.unwrap();
        assert_eq!(record.tracking_number.as_deref(), Some("TRK-2"));
    }

    #[tokio::test]
    async fn retry_requires_failed_payment_request() {
        let (coordinator, store, _) = coordinator();
        let order_id = stored_order(&store, OrderStatus::PendingPayment).await;

        let result = coordinator.retry_payment_request(&order_id, card()).await;
        assert!(matches!(
            result,
            Err(CoordinatorError::InvalidTransition { .. })
        ));
    }
}
