//! Value objects for the order domain.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Money amount represented in cents to avoid floating point issues.
///
/// Amounts travel as decimal strings (`"42.00"`); `Money` is only used to
/// check and compare them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Parses a non-negative decimal string with at most two fraction digits.
    ///
    /// `field` names the input in the error.
    pub fn parse(field: &'static str, value: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidAmount {
            field,
            value: value.to_string(),
        };

        let trimmed = value.trim();
        let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));

        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) || fraction.len() > 2
        {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let fraction_cents = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse::<i64>().map_err(|_| invalid())?,
        };

        whole
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(fraction_cents))
            .map(Self::from_cents)
            .ok_or_else(invalid)
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Formats the amount as a plain decimal string, e.g. `"42.00"`.
    pub fn to_decimal_string(&self) -> String {
        format!("{}.{:02}", self.cents / 100, self.cents.abs() % 100)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.to_decimal_string())
    }
}

/// A line item in an order's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product identifier.
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Accepts a JSON number or a numeric string.
    #[serde(deserialize_with = "quantity_from_number_or_string")]
    pub quantity: u32,

    /// Unit price as a decimal string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

impl CartItem {
    /// Creates a cart item.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        quantity: u32,
        price: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: Some(description.into()),
            quantity,
            price: Some(price.into()),
        }
    }

    fn validate(&self, index: usize) -> Result<(), ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidCartItem {
            index,
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id is required"));
        }
        if self.quantity == 0 {
            return Err(invalid("quantity must be greater than 0"));
        }
        if let Some(price) = &self.price {
            Money::parse("price", price).map_err(|e| invalid(&e.to_string()))?;
        }
        Ok(())
    }
}

/// Validates every item of a cart.
pub(crate) fn validate_cart(cart: &[CartItem]) -> Result<(), ValidationError> {
    if cart.is_empty() {
        return Err(ValidationError::EmptyCart);
    }
    cart.iter()
        .enumerate()
        .try_for_each(|(index, item)| item.validate(index))
}

fn quantity_from_number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Postal address of the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Payment card captured when an order is placed.
///
/// Forwarded in the payment request and then dropped; never stored with the
/// order. `Debug` masks the number and CVV.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    #[serde(rename = "type", default)]
    pub card_type: String,
    pub number: String,
    #[serde(rename = "expiryMonth")]
    pub expiry_month: u32,
    #[serde(rename = "expiryYear")]
    pub expiry_year: u32,
    pub cvv: String,
}

impl CardDetails {
    /// Checks the shape of the card data. Whether the card is accepted is up
    /// to the payment service.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let number: Vec<char> = self.number_digits().collect();
        let well_formed = self
            .number
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-');
        if !well_formed || !(12..=19).contains(&number.len()) {
            return Err(ValidationError::InvalidCard(
                "number must contain 12 to 19 digits".to_string(),
            ));
        }
        if !(1..=12).contains(&self.expiry_month) {
            return Err(ValidationError::InvalidCard(format!(
                "expiry month {} is out of range",
                self.expiry_month
            )));
        }
        if self.expiry_year == 0 {
            return Err(ValidationError::InvalidCard(
                "expiry year is required".to_string(),
            ));
        }
        if !(3..=4).contains(&self.cvv.len()) || !self.cvv.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidCard(
                "cvv must be 3 or 4 digits".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns true if the card number passes the Luhn checksum.
    pub fn passes_luhn(&self) -> bool {
        let digits: Vec<u32> = self
            .number_digits()
            .filter_map(|c| c.to_digit(10))
            .collect();
        if digits.len() < 12 {
            return false;
        }

        let sum: u32 = digits
            .iter()
            .rev()
            .enumerate()
            .map(|(i, &d)| {
                if i % 2 == 1 {
                    let doubled = d * 2;
                    if doubled > 9 { doubled - 9 } else { doubled }
                } else {
                    d
                }
            })
            .sum();
        sum % 10 == 0
    }

    /// Last four digits of the card number.
    pub fn last_four(&self) -> String {
        let digits: Vec<char> = self.number_digits().collect();
        digits[digits.len().saturating_sub(4)..].iter().collect()
    }

    fn number_digits(&self) -> impl Iterator<Item = char> + '_ {
        self.number.chars().filter(|c| c.is_ascii_digit())
    }
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("card_type", &self.card_type)
            .field("number", &format_args!("****{}", self.last_four()))
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("cvv", &"***")
            .finish()
    }
}
