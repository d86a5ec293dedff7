//! Core data model for the clustering pipeline

pub mod field;
pub mod record;

pub use field::OptionalField;
pub use record::{ClusteredPoint, EventRecord, NOISE_LABEL};
