use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::{Order, OrderStatus};
use serde::{Deserialize, Serialize};

/// Entity-type marker under which order records are stored.
pub const ORDER_ENTITY: &str = "ORDER";

/// Version number of an order record, used for optimistic concurrency control.
///
/// A record is written at version 1 and every status update increments it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a freshly created record.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A stored order: the immutable order document plus its lifecycle state.
///
/// Serializes flat, so API consumers see the order fields with `status`
/// populated next to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(flatten)]
    pub order: Order,

    pub status: OrderStatus,

    /// Last message attached to a status change (e.g. a decline reason).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,

    #[serde(rename = "transactionID", default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    #[serde(rename = "trackingNumber", default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,

    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Creates a record at version 1.
    pub fn new(order: Order, status: OrderStatus) -> Self {
        let now = Utc::now();
        Self {
            order,
            status,
            status_message: None,
            transaction_id: None,
            tracking_number: None,
            version: Version::first(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the order ID (the record's sort key).
    pub fn order_id(&self) -> &OrderId {
        &self.order.order_id
    }

    /// Returns the owner (the record's secondary lookup attribute).
    pub fn owner_id(&self) -> &UserId {
        &self.order.user_id
    }

    /// Applies a status change in place and bumps the version.
    pub fn apply(&mut self, change: &StatusChange) {
        self.status = change.status;
        if change.replace_details {
            self.status_message = change.message.clone();
            self.transaction_id = change.transaction_id.clone();
            self.tracking_number = change.tracking_number.clone();
        } else {
            if let Some(message) = &change.message {
                self.status_message = Some(message.clone());
            }
            if let Some(transaction_id) = &change.transaction_id {
                self.transaction_id = Some(transaction_id.clone());
            }
            if let Some(tracking_number) = &change.tracking_number {
                self.tracking_number = Some(tracking_number.clone());
            }
        }
        self.version = self.version.next();
        self.updated_at = Utc::now();
    }
}

/// A status overwrite with optional detail fields.
///
/// Detail fields left as `None` keep their stored value, unless
/// `replace_details` is set, in which case all three are written as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub message: Option<String>,
    pub transaction_id: Option<String>,
    pub tracking_number: Option<String>,
    pub replace_details: bool,
}

impl StatusChange {
    /// Creates a change to the given status.
    pub fn to(status: OrderStatus) -> Self {
        Self {
            status,
            message: None,
            transaction_id: None,
            tracking_number: None,
            replace_details: false,
        }
    }

    /// Puts a record back exactly as it was: status and every detail field,
    /// including the ones that were unset.
    pub fn restoring(previous: &OrderRecord) -> Self {
        Self {
            status: previous.status,
            message: previous.status_message.clone(),
            transaction_id: previous.transaction_id.clone(),
            tracking_number: previous.tracking_number.clone(),
            replace_details: true,
        }
    }

    /// Writes the detail fields as given, clearing the ones left unset.
    pub fn replacing_details(mut self) -> Self {
        self.replace_details = true;
        self
    }

    /// Attaches a message. Empty strings are ignored.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = non_empty(message.into());
        self
    }

    /// Attaches a payment transaction ID. Empty strings are ignored.
    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = non_empty(transaction_id.into());
        self
    }

    /// Attaches a shipment tracking number. Empty strings are ignored.
    pub fn with_tracking_number(mut self, tracking_number: impl Into<String>) -> Self {
        self.tracking_number = non_empty(tracking_number.into());
        self
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}
