//! PostgreSQL adapter implementing [`DataSource`]

use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{count_query, order_from_row, page_query};
use crate::adapters::source::DataSource;
use crate::domain::{Cursor, DataSourceError, ExportFilter, Order, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Orders table exposed as a [`DataSource`]
pub struct PostgresDataSource {
    client: Arc<PostgreSQLClient>,
    page_sql: String,
    count_sql: String,
}

impl PostgresDataSource {
    /// Prepares the page and count statements for the client's table
    pub fn new(client: PostgreSQLClient) -> Self {
        let client = Arc::new(client);
        let page_sql = page_query(client.table());
        let count_sql = count_query(client.table());
        Self {
            client,
            page_sql,
            count_sql,
        }
    }
}

#[async_trait]
impl DataSource for PostgresDataSource {
    fn name(&self) -> &str {
        "postgresql"
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn count(&self, filter: &ExportFilter) -> Result<u64> {
        let rows = self
            .client
            .query(&self.count_sql, &[&filter.from, &filter.to, &filter.status])
            .await?;

        let count: i64 = rows
            .first()
            .ok_or_else(|| DataSourceError::QueryFailed("COUNT returned no rows".to_string()))?
            .try_get(0)
            .map_err(|e| DataSourceError::InvalidRow(format!("count: {e}")))?;

        Ok(count.max(0) as u64)
    }

    async fn fetch_page(
        &self,
        cursor: Cursor,
        limit: usize,
        filter: &ExportFilter,
    ) -> Result<Vec<Order>> {
        let last_seen = cursor.last_seen();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = self
            .client
            .query(
                &self.page_sql,
                &[&last_seen, &filter.from, &filter.to, &filter.status, &limit],
            )
            .await?;

        tracing::trace!(cursor = %cursor, returned = rows.len(), "Fetched page from PostgreSQL");

        rows.iter()
            .map(|row| order_from_row(row).map_err(Into::into))
            .collect()
    }
}
