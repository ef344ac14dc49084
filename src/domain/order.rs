//! Order record model
//!
//! An order is the unit exported as one spreadsheet row.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One exported order
///
/// # Examples
///
/// ```
/// use quarry::domain::Order;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let created = NaiveDate::from_ymd_opt(2024, 3, 1)
///     .unwrap()
///     .and_hms_opt(9, 30, 0)
///     .unwrap();
/// let order = Order::new(1, "ORD-0001", "PAID", Decimal::new(1999, 2), "EUR", created)
///     .with_customer("Ada Lovelace", "ada@example.com");
///
/// assert_eq!(order.customer_name.as_deref(), Some("Ada Lovelace"));
/// assert!(order.notes.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Primary key, strictly increasing in fetch order
    pub id: i64,
    pub order_number: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub status: String,
    pub total_amount: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
    /// Free text, may be arbitrarily long
    pub notes: Option<String>,
}

impl Order {
    /// Creates an order with all optional fields absent
    pub fn new(
        id: i64,
        order_number: impl Into<String>,
        status: impl Into<String>,
        total_amount: Decimal,
        currency: impl Into<String>,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            order_number: order_number.into(),
            customer_name: None,
            customer_email: None,
            status: status.into(),
            total_amount,
            currency: currency.into(),
            created_at,
            updated_at: None,
            notes: None,
        }
    }

    /// Sets customer name and email
    pub fn with_customer(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self.customer_email = Some(email.into());
        self
    }

    /// Sets the last update timestamp
    pub fn with_updated_at(mut self, updated_at: NaiveDateTime) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Sets the notes field
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
