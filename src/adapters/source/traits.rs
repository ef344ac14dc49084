//! Data source abstraction
//!
//! Every backend that feeds the export engine implements [`DataSource`].

use crate::domain::{Cursor, ExportFilter, Order, Result};
use async_trait::async_trait;

/// Paginated, read-only access to orders
///
/// Implementations must return pages in ascending id order, with every id
/// strictly greater than the cursor and at most `limit` records. A page
/// shorter than `limit` means the data is exhausted.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Test the connection to the backend
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    /// Counts orders matching the filter
    ///
    /// The value is a snapshot; concurrent writes may make it stale.
    async fn count(&self, filter: &ExportFilter) -> Result<u64>;

    /// Fetches up to `limit` matching orders with ids after `cursor`
    async fn fetch_page(
        &self,
        cursor: Cursor,
        limit: usize,
        filter: &ExportFilter,
    ) -> Result<Vec<Order>>;
}
