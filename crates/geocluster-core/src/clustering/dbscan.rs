//! Fixed-radius density clustering (DBSCAN) over great-circle distance

use rayon::prelude::*;
use tracing::debug;

use super::geo::{GeoPoint, SphereIndex};
use super::strategy::ClusterStrategy;
use crate::error::ClusterError;
use crate::types::NOISE_LABEL;

/// DBSCAN with a haversine neighbourhood.
///
/// A point is core when at least `min_samples` points (itself included) lie
/// within `eps` radians. Neighbour counting runs on the rayon pool; expansion
/// walks points in input order, so labels do not depend on thread count.
#[derive(Debug, Clone)]
pub struct DbscanStrategy {
    /// Neighbourhood radius, radians
    eps: f64,
    /// Minimum neighbourhood size, point itself included
    min_samples: usize,
}

impl DbscanStrategy {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }
}

impl ClusterStrategy for DbscanStrategy {
    fn name(&self) -> &'static str {
        "dbscan"
    }

    fn preflight(&self, _n_points: usize) -> Result<(), ClusterError> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(ClusterError::invalid_parameter(
                "eps",
                format!("must be positive and finite, got {}", self.eps),
            ));
        }
        if self.min_samples == 0 {
            return Err(ClusterError::invalid_parameter("min_samples", "must be at least 1"));
        }
        Ok(())
    }

    fn fit(&self, points: &[GeoPoint]) -> Result<Vec<i32>, ClusterError> {
        let n = points.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let index = SphereIndex::build(points);

        let is_core: Vec<bool> = (0..n)
            .into_par_iter()
            .map(|i| index.count_within(i, self.eps) >= self.min_samples)
            .collect();

        debug!(
            points = n,
            core_points = is_core.iter().filter(|&&c| c).count(),
            eps = self.eps,
            min_samples = self.min_samples,
            "DBSCAN core points identified"
        );

        let mut labels = vec![NOISE_LABEL; n];
        let mut next_label = 0i32;
        let mut stack = Vec::new();

        for start in 0..n {
            if labels[start] != NOISE_LABEL || !is_core[start] {
                continue;
            }

            stack.push(start);
            while let Some(p) = stack.pop() {
                if labels[p] != NOISE_LABEL {
                    continue;
                }
                labels[p] = next_label;
                if !is_core[p] {
                    continue; // border point: joins, does not expand
                }
                stack.extend(
                    index
                        .within(p, self.eps)
                        .into_iter()
                        .filter(|&q| labels[q] == NOISE_LABEL),
                );
            }
            next_label += 1;
        }

        debug!(clusters = next_label, "DBSCAN expansion finished");
        Ok(labels)
    }
}
