//! In-memory data source
//!
//! Backs the test suite and the CLI demo mode. Supports fault injection on
//! a chosen fetch and records every fetch for pagination assertions.

use super::traits::DataSource;
use crate::domain::{Cursor, DataSourceError, ExportFilter, Order, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One recorded `fetch_page` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    pub cursor: Cursor,
    pub limit: usize,
    pub returned: usize,
}

/// Orders held in a vector sorted by id
#[derive(Debug, Default)]
pub struct InMemoryDataSource {
    orders: Vec<Order>,
    fail_on_fetch: Option<usize>,
    fail_on_count: bool,
    fetch_delay: Option<Duration>,
    fetches: AtomicUsize,
    fetch_log: Mutex<Vec<FetchRecord>>,
}

impl InMemoryDataSource {
    /// Creates a source over the given orders
    ///
    /// Orders are sorted by id and duplicate ids are dropped.
    pub fn new(mut orders: Vec<Order>) -> Self {
        orders.sort_by_key(|o| o.id);
        orders.dedup_by_key(|o| o.id);
        Self {
            orders,
            ..Self::default()
        }
    }

    /// Creates a source with `count` generated orders, ids `1..=count`
    pub fn generated(count: usize) -> Self {
        Self::new((1..=count as i64).map(demo_order).collect())
    }

    /// Makes the `n`-th fetch (1-based) fail with a query error
    pub fn fail_on_fetch(mut self, n: usize) -> Self {
        self.fail_on_fetch = Some(n);
        self
    }

    /// Makes every `count` call fail
    pub fn fail_on_count(mut self) -> Self {
        self.fail_on_count = true;
        self
    }

    /// Sleeps before answering each fetch
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Number of orders held
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of `fetch_page` calls so far, failed ones included
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Snapshot of successful fetches in call order
    pub fn fetch_log(&self) -> Vec<FetchRecord> {
        self.fetch_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn record(&self, record: FetchRecord) {
        match self.fetch_log.lock() {
            Ok(mut log) => log.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn count(&self, filter: &ExportFilter) -> Result<u64> {
        if self.fail_on_count {
            return Err(DataSourceError::QueryFailed("injected count failure".to_string()).into());
        }
        Ok(self.orders.iter().filter(|o| filter.matches(o)).count() as u64)
    }

    async fn fetch_page(
        &self,
        cursor: Cursor,
        limit: usize,
        filter: &ExportFilter,
    ) -> Result<Vec<Order>> {
        let call = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_on_fetch == Some(call) {
            return Err(DataSourceError::QueryFailed(format!(
                "injected failure on fetch {call} (cursor {cursor})"
            ))
            .into());
        }

        let start = self.orders.partition_point(|o| !cursor.admits(o.id));
        let page: Vec<Order> = self.orders[start..]
            .iter()
            .filter(|o| filter.matches(o))
            .take(limit)
            .cloned()
            .collect();

        self.record(FetchRecord {
            cursor,
            limit,
            returned: page.len(),
        });

        Ok(page)
    }
}

const DEMO_STATUSES: [&str; 5] = ["NEW", "PAID", "SHIPPED", "DELIVERED", "CANCELLED"];
const DEMO_CURRENCIES: [&str; 3] = ["USD", "EUR", "GBP"];
const DEMO_NAMES: [&str; 6] = [
    "Ada Lovelace",
    "Grace Hopper",
    "Alan Turing",
    "Edsger Dijkstra",
    "Barbara Liskov",
    "Donald Knuth",
];

/// Builds a deterministic sample order for `id`
pub fn demo_order(id: i64) -> Order {
    let idx = id.unsigned_abs() as usize;
    let base = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let created_at = base + ChronoDuration::minutes(id);
    let name = DEMO_NAMES[idx % DEMO_NAMES.len()];
    let email = format!(
        "{}{}@example.com",
        name.split(' ').next().unwrap_or("customer").to_lowercase(),
        id
    );

    let mut order = Order::new(
        id,
        format!("ORD-{id:08}"),
        DEMO_STATUSES[idx % DEMO_STATUSES.len()],
        Decimal::new((id * 1_379) % 10_000_000 + 99, 2),
        DEMO_CURRENCIES[idx % DEMO_CURRENCIES.len()],
        created_at,
    )
    .with_customer(name, email);

    if idx % 3 == 0 {
        order = order.with_updated_at(created_at + ChronoDuration::hours(2));
    }
    if idx % 10 == 0 {
        order = order.with_notes(format!("Gift wrap requested for order {id}"));
    }
    order
}
