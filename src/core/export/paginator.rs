//! Cursor-based page iteration
//!
//! Drives [`DataSource::fetch_page`] until a short page arrives, checking
//! each page against the pagination contract on the way.

use crate::adapters::source::DataSource;
use crate::domain::{Cursor, DataSourceError, ExportFilter, Order, Result};

/// Step-wise reader over all orders matching a filter
pub struct Paginator<'a> {
    source: &'a dyn DataSource,
    filter: &'a ExportFilter,
    chunk_size: usize,
    cursor: Cursor,
    exhausted: bool,
    pages: usize,
}

impl<'a> Paginator<'a> {
    pub fn new(source: &'a dyn DataSource, filter: &'a ExportFilter, chunk_size: usize) -> Self {
        Self {
            source,
            filter,
            chunk_size: chunk_size.max(1),
            cursor: Cursor::start(),
            exhausted: false,
            pages: 0,
        }
    }

    /// Last id handed out
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Pages fetched so far
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Fetches the next page, `None` once the data is exhausted
    ///
    /// # Errors
    ///
    /// Source errors are returned as-is and are not retried. A page that is
    /// too long, out of order, or not strictly after the cursor yields
    /// [`DataSourceError::ContractViolation`].
    pub async fn next_page(&mut self) -> Result<Option<Vec<Order>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .source
            .fetch_page(self.cursor, self.chunk_size, self.filter)
            .await?;
        self.pages += 1;

        self.check_contract(&page)?;

        if page.len() < self.chunk_size {
            self.exhausted = true;
        }
        let Some(last) = page.last() else {
            return Ok(None);
        };
        self.cursor = Cursor::after(last.id);

        tracing::trace!(
            page = self.pages,
            rows = page.len(),
            cursor = %self.cursor,
            "Fetched page"
        );
        Ok(Some(page))
    }

    fn check_contract(&self, page: &[Order]) -> Result<()> {
        if page.len() > self.chunk_size {
            return Err(DataSourceError::ContractViolation(format!(
                "page of {} rows exceeds limit {}",
                page.len(),
                self.chunk_size
            ))
            .into());
        }

        let mut bound = self.cursor;
        for order in page {
            if !bound.admits(order.id) {
                return Err(DataSourceError::ContractViolation(format!(
                    "id {} is not after {}",
                    order.id, bound
                ))
                .into());
            }
            bound = Cursor::after(order.id);
        }
        Ok(())
    }
}
