//! Domain models and types for Quarry.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Records and requests** ([`Order`], [`ExportFilter`], [`ExportRequest`])
//! - **Job lifecycle** ([`Job`], [`JobState`])
//! - **Strongly-typed identifiers** ([`JobId`], [`Cursor`])
//! - **Error types** ([`QuarryError`], [`DataSourceError`], [`SpreadsheetError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, QuarryError>`]:
//!
//! ```rust
//! use quarry::domain::{QuarryError, Result};
//!
//! fn example() -> Result<()> {
//!     Err(QuarryError::Validation("chunk_size must be > 0".to_string()))
//! }
//! ```

pub mod errors;
pub mod filter;
pub mod ids;
pub mod job;
pub mod order;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{DataSourceError, QuarryError, SpreadsheetError};
pub use filter::{ExportFilter, ExportRequest};
pub use ids::{Cursor, JobId};
pub use job::{Job, JobState};
pub use order::Order;
pub use result::Result;
