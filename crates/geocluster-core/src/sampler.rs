//! Deterministic subsampling to a point budget

use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::config::SAMPLE_SEED;

/// Reduces a dataset to at most `max_points` rows.
///
/// Selection is uniform without replacement from a fixed-seed generator, so
/// the same input and budget always yield the same rows. Selected rows keep
/// their source order.
#[derive(Debug, Clone)]
pub struct Sampler {
    max_points: usize,
    seed: u64,
}

impl Sampler {
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points,
            seed: SAMPLE_SEED,
        }
    }

    /// Positions of the rows to keep, ascending
    pub fn select_indices(&self, len: usize) -> Vec<usize> {
        if len <= self.max_points {
            return (0..len).collect();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut picked = index::sample(&mut rng, len, self.max_points).into_vec();
        picked.sort_unstable();
        picked
    }

    /// Apply the budget. Identity when the input already fits.
    pub fn sample<T>(&self, rows: Vec<T>) -> Vec<T> {
        let len = rows.len();
        if len <= self.max_points {
            return rows;
        }

        let picked = self.select_indices(len);
        let mut keep = vec![false; len];
        for &i in &picked {
            keep[i] = true;
        }

        let sampled: Vec<T> = rows
            .into_iter()
            .zip(keep)
            .filter_map(|(row, k)| k.then_some(row))
            .collect();

        info!(
            "Subsampled {} rows to {} (seed {})",
            len,
            sampled.len(),
            self.seed
        );
        sampled
    }
}
