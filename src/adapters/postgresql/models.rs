//! Row mapping and SQL for the orders table

use crate::domain::{DataSourceError, Order};
use tokio_postgres::Row;

const ORDER_COLUMNS: &str = "id, order_number, customer_name, customer_email, status, \
     total_amount, currency, created_at, updated_at, notes";

/// Page query; `$1` cursor, `$2`/`$3` created_at bounds, `$4` status, `$5` limit
pub fn page_query(table: &str) -> String {
    format!(
        "SELECT {ORDER_COLUMNS} FROM {table} \
         WHERE ($1::BIGINT IS NULL OR id > $1) \
         AND ($2::TIMESTAMP IS NULL OR created_at >= $2) \
         AND ($3::TIMESTAMP IS NULL OR created_at <= $3) \
         AND ($4::TEXT IS NULL OR status = $4) \
         ORDER BY id ASC LIMIT $5"
    )
}

/// Count query sharing the page predicates; `$1`/`$2` bounds, `$3` status
pub fn count_query(table: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM {table} \
         WHERE ($1::TIMESTAMP IS NULL OR created_at >= $1) \
         AND ($2::TIMESTAMP IS NULL OR created_at <= $2) \
         AND ($3::TEXT IS NULL OR status = $3)"
    )
}

/// Decodes one result row into an [`Order`]
pub fn order_from_row(row: &Row) -> std::result::Result<Order, DataSourceError> {
    let invalid = |column: &str, e: tokio_postgres::Error| {
        DataSourceError::InvalidRow(format!("column '{column}': {e}"))
    };

    Ok(Order {
        id: row.try_get("id").map_err(|e| invalid("id", e))?,
        order_number: row
            .try_get("order_number")
            .map_err(|e| invalid("order_number", e))?,
        customer_name: row
            .try_get("customer_name")
            .map_err(|e| invalid("customer_name", e))?,
        customer_email: row
            .try_get("customer_email")
            .map_err(|e| invalid("customer_email", e))?,
        status: row.try_get("status").map_err(|e| invalid("status", e))?,
        total_amount: row
            .try_get("total_amount")
            .map_err(|e| invalid("total_amount", e))?,
        currency: row.try_get("currency").map_err(|e| invalid("currency", e))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| invalid("created_at", e))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| invalid("updated_at", e))?,
        notes: row.try_get("notes").map_err(|e| invalid("notes", e))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_orders_by_id() {
        let sql = page_query("sales.orders");
        assert!(sql.contains("FROM sales.orders"));
        assert!(sql.contains("id > $1"));
        assert!(sql.ends_with("ORDER BY id ASC LIMIT $5"));
    }

    #[test]
    fn test_count_query_shares_predicates() {
        let sql = count_query("orders");
        assert!(sql.starts_with("SELECT COUNT(*) FROM orders"));
        assert!(sql.contains("created_at >= $1"));
        assert!(sql.contains("status = $3"));
        assert!(!sql.contains("LIMIT"));
    }
}
