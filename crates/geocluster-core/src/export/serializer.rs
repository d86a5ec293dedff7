//! Per-point JSON array writer

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::types::ClusteredPoint;

/// Output shape of one clustered point.
///
/// Optional attributes are written only when the source row held a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointRecord<'a> {
    pub lat: f64,
    pub lon: f64,
    pub cluster_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nkill: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iyear: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_txt: Option<&'a str>,
}

impl<'a> From<&'a ClusteredPoint> for PointRecord<'a> {
    fn from(point: &'a ClusteredPoint) -> Self {
        let record = &point.record;
        Self {
            lat: record.latitude,
            lon: record.longitude,
            cluster_id: point.cluster_id,
            nkill: record.severity.value().copied(),
            iyear: record.year.value().copied(),
            region_txt: record.region.value().map(String::as_str),
        }
    }
}

/// Write the points as one JSON array, replacing any existing file
pub fn write_points(path: impl AsRef<Path>, points: &[ClusteredPoint]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);

    write_points_to(&mut writer, points)?;
    writer.flush().map_err(|e| Error::io(path, e))?;

    info!("Wrote {} points to {}", points.len(), path.display());
    Ok(())
}

/// Serialize the points as one JSON array into any writer
pub fn write_points_to<W: Write>(writer: W, points: &[ClusteredPoint]) -> Result<()> {
    let records: Vec<PointRecord<'_>> = points.iter().map(PointRecord::from).collect();
    serde_json::to_writer(writer, &records)?;
    Ok(())
}
