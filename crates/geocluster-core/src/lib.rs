//! geocluster-core: density clustering of geocoded events
//!
//! A one-shot batch pipeline. A delimited table is read and its coordinate
//! columns detected, rows are subsampled to a point budget with a fixed seed,
//! points are clustered by great-circle distance (HDBSCAN with a DBSCAN
//! fallback), and the labelled points are written as a JSON array.

pub mod clustering;
pub mod config;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod pipeline;
pub mod sampler;
pub mod types;

pub use clustering::{ClusterOutcome, ClusterStrategy, FallbackClusterer, GeoPoint};
pub use config::{AlgorithmChoice, PipelineConfig, TextEncoding};
pub use error::{ClusterError, Error, Result};
pub use export::Summary;
pub use pipeline::Pipeline;
pub use types::{ClusteredPoint, EventRecord, OptionalField, NOISE_LABEL};
