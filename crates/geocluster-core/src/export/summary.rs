//! Aggregate run summary

use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::Result;
use crate::types::ClusteredPoint;

/// Counts reported once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Points written
    pub points: usize,
    /// Distinct non-negative cluster labels
    pub clusters: usize,
    /// Points labelled noise
    pub noise: usize,
    /// Strategy that produced the labels
    pub algorithm: String,
}

impl Summary {
    pub fn from_points(points: &[ClusteredPoint], algorithm: impl Into<String>) -> Self {
        let clusters: BTreeSet<i32> = points
            .iter()
            .filter(|p| !p.is_noise())
            .map(|p| p.cluster_id)
            .collect();
        Self {
            points: points.len(),
            clusters: clusters.len(),
            noise: points.iter().filter(|p| p.is_noise()).count(),
            algorithm: algorithm.into(),
        }
    }

    /// Compact single-line JSON
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
