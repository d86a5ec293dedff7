//! Table ingestion: header resolution, cell coercion and row filtering

mod loader;
mod schema;

pub use loader::{Dataset, LoadReport, TableLoader};
pub use schema::{ColumnMap, LogicalField};
