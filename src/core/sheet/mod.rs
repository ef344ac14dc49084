//! XLSX output
//!
//! - [`columns`] - ordered column descriptors and cell values
//! - [`writer`] - windowed writer with sheet splitting and packaging
//! - [`xml`] - SpreadsheetML parts and text helpers

pub mod columns;
pub mod writer;
pub mod xml;

pub use columns::{CellFormat, CellValue, Column, ColumnSet, DATE_TIME_PATTERN, ORDER_COLUMNS};
pub use writer::{SheetSettings, SheetState, SpreadsheetWriter, WorkbookSummary};
