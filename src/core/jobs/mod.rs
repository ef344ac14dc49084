//! Export job tracking
//!
//! - [`JobStore`] - storage trait, with [`InMemoryJobStore`] as the default
//! - [`JobRegistry`] - lifecycle operations used by the export engine

pub mod registry;
pub mod store;

pub use registry::JobRegistry;
pub use store::{InMemoryJobStore, JobStore};
