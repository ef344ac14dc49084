//! Column declarations for the orders export
//!
//! One ordered list of descriptors drives both the header row and every
//! data row, so the two can never drift apart.

use crate::domain::{Order, QuarryError, Result};
use rust_decimal::Decimal;

/// Text pattern used for timestamp cells
pub const DATE_TIME_PATTERN: &str = "%Y-%m-%d %H:%M:%S";

/// Number format applied to currency cells
pub const CURRENCY_FORMAT: &str = "#,##0.00";

/// How a column's cells are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormat {
    /// Plain numeric cell
    Number,
    /// Numeric cell styled with [`CURRENCY_FORMAT`]
    Currency,
    /// Inline text, subject to truncation
    Text,
    /// Timestamp rendered as text with [`DATE_TIME_PATTERN`]
    DateTime,
}

/// Value extracted from an order for one cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Decimal(Decimal),
    Text(String),
    Empty,
}

/// One exported column
pub struct Column {
    pub key: &'static str,
    pub header: &'static str,
    pub format: CellFormat,
    extract: fn(&Order) -> CellValue,
}

impl Column {
    /// Pulls this column's value out of an order
    pub fn value(&self, order: &Order) -> CellValue {
        (self.extract)(order)
    }
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("header", &self.header)
            .field("format", &self.format)
            .finish()
    }
}

fn text(value: &str) -> CellValue {
    CellValue::Text(value.to_string())
}

fn optional_text(value: &Option<String>) -> CellValue {
    value.as_deref().map_or(CellValue::Empty, text)
}

fn timestamp(value: chrono::NaiveDateTime) -> CellValue {
    CellValue::Text(value.format(DATE_TIME_PATTERN).to_string())
}

/// Every column of the orders export, in output order
pub static ORDER_COLUMNS: [Column; 10] = [
    Column {
        key: "id",
        header: "ID",
        format: CellFormat::Number,
        extract: |o| CellValue::Integer(o.id),
    },
    Column {
        key: "order_number",
        header: "Order Number",
        format: CellFormat::Text,
        extract: |o| text(&o.order_number),
    },
    Column {
        key: "customer_name",
        header: "Customer Name",
        format: CellFormat::Text,
        extract: |o| optional_text(&o.customer_name),
    },
    Column {
        key: "customer_email",
        header: "Email",
        format: CellFormat::Text,
        extract: |o| optional_text(&o.customer_email),
    },
    Column {
        key: "status",
        header: "Status",
        format: CellFormat::Text,
        extract: |o| text(&o.status),
    },
    Column {
        key: "total_amount",
        header: "Total Amount",
        format: CellFormat::Currency,
        extract: |o| CellValue::Decimal(o.total_amount),
    },
    Column {
        key: "currency",
        header: "Currency",
        format: CellFormat::Text,
        extract: |o| text(&o.currency),
    },
    Column {
        key: "created_at",
        header: "Created At",
        format: CellFormat::DateTime,
        extract: |o| timestamp(o.created_at),
    },
    Column {
        key: "updated_at",
        header: "Updated At",
        format: CellFormat::DateTime,
        extract: |o| o.updated_at.map_or(CellValue::Empty, timestamp),
    },
    Column {
        key: "notes",
        header: "Notes",
        format: CellFormat::Text,
        extract: |o| optional_text(&o.notes),
    },
];

/// Ordered selection of columns
#[derive(Debug, Clone)]
pub struct ColumnSet {
    columns: Vec<&'static Column>,
}

impl ColumnSet {
    /// All columns in declared order
    pub fn all() -> Self {
        Self {
            columns: ORDER_COLUMNS.iter().collect(),
        }
    }

    /// Columns for an optional projection
    ///
    /// The result keeps declared order whatever order the keys come in.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Validation`] for an empty projection or an
    /// unknown key.
    pub fn project(keys: Option<&[String]>) -> Result<Self> {
        let Some(keys) = keys else {
            return Ok(Self::all());
        };

        if keys.is_empty() {
            return Err(QuarryError::Validation(
                "column projection cannot be empty".to_string(),
            ));
        }

        let unknown: Vec<&str> = keys
            .iter()
            .map(String::as_str)
            .filter(|k| !ORDER_COLUMNS.iter().any(|c| c.key == *k))
            .collect();
        if !unknown.is_empty() {
            return Err(QuarryError::Validation(format!(
                "unknown column(s): {}. Valid columns: {}",
                unknown.join(", "),
                ORDER_COLUMNS
                    .iter()
                    .map(|c| c.key)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        Ok(Self {
            columns: ORDER_COLUMNS
                .iter()
                .filter(|c| keys.iter().any(|k| k == c.key))
                .collect(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static Column> + '_ {
        self.columns.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.iter().map(|c| c.header).collect()
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.iter().map(|c| c.key).collect()
    }
}

impl Default for ColumnSet {
    fn default() -> Self {
        Self::all()
    }
}
