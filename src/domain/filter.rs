//! Export filter and request types

use crate::domain::order::Order;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Selection criteria shared by count and paginated fetch
///
/// Both time bounds are inclusive and apply to `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFilter {
    #[serde(default)]
    pub from: Option<NaiveDateTime>,
    #[serde(default)]
    pub to: Option<NaiveDateTime>,
    #[serde(default)]
    pub status: Option<String>,
    /// Column keys to export, in any order; `None` exports every column
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

impl ExportFilter {
    /// Filter that matches every order
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_from(mut self, from: NaiveDateTime) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: NaiveDateTime) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Whether an order satisfies the row predicates (projection is ignored)
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(from) = self.from {
            if order.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if order.created_at > to {
                return false;
            }
        }
        if let Some(ref status) = self.status {
            if &order.status != status {
                return false;
            }
        }
        true
    }
}

/// A caller's export request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    #[serde(flatten)]
    pub filter: ExportFilter,

    /// Always route to a background job when set
    #[serde(default, rename = "async")]
    pub async_requested: bool,
}

impl ExportRequest {
    pub fn new(filter: ExportFilter) -> Self {
        Self {
            filter,
            async_requested: false,
        }
    }

    /// Marks the request as explicitly asynchronous
    pub fn asynchronous(mut self) -> Self {
        self.async_requested = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn order(id: i64, day: u32, status: &str) -> Order {
        Order::new(id, format!("ORD-{id}"), status, Decimal::ONE, "USD", at(day))
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = ExportFilter::all();
        assert!(filter.matches(&order(1, 1, "NEW")));
        assert!(filter.matches(&order(2, 31, "CANCELLED")));
    }

    #[test]
    fn test_time_bounds_are_inclusive() {
        let filter = ExportFilter::all().with_from(at(10)).with_to(at(20));
        assert!(!filter.matches(&order(1, 9, "NEW")));
        assert!(filter.matches(&order(2, 10, "NEW")));
        assert!(filter.matches(&order(3, 20, "NEW")));
        assert!(!filter.matches(&order(4, 21, "NEW")));
    }

    #[test]
    fn test_status_predicate() {
        let filter = ExportFilter::all().with_status("PAID");
        assert!(filter.matches(&order(1, 1, "PAID")));
        assert!(!filter.matches(&order(2, 1, "paid")));
    }

    #[test]
    fn test_request_deserializes_async_flag() {
        let request: ExportRequest =
            serde_json::from_str(r#"{"status": "PAID", "async": true}"#).unwrap();
        assert!(request.async_requested);
        assert_eq!(request.filter.status.as_deref(), Some("PAID"));
        assert!(request.filter.columns.is_none());
    }
}
