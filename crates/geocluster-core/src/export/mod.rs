//! Output: per-point JSON document and the run summary line

mod serializer;
mod summary;

pub use serializer::{write_points, write_points_to, PointRecord};
pub use summary::Summary;
