//! Data ingestion and dataset handling
//!
//! CSV loading and Burn dataset plumbing for rep metric tables.

pub mod dataset;
pub mod loader;

pub use dataset::RepDataset;
pub use loader::load_records;
