//! Order data sources
//!
//! - [`DataSource`] - the pagination contract used by the export engine
//! - [`InMemoryDataSource`] - vector-backed source for tests and demos
//!
//! The PostgreSQL implementation lives in [`crate::adapters::postgresql`].

pub mod memory;
pub mod traits;

pub use memory::{demo_order, FetchRecord, InMemoryDataSource};
pub use traits::DataSource;
