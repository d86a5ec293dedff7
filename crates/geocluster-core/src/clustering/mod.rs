//! Density clustering over great-circle distance

mod dbscan;
pub mod geo;
#[cfg(feature = "hdbscan")]
mod hdbscan;
mod strategy;

pub use dbscan::DbscanStrategy;
pub use geo::{haversine, GeoPoint};
#[cfg(feature = "hdbscan")]
pub use hdbscan::HdbscanStrategy;
pub use strategy::{ClusterOutcome, ClusterStrategy, FallbackClusterer};
