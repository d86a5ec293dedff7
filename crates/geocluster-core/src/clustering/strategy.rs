//! Clustering strategies and the fallback chain that runs them

use tracing::{debug, info, warn};

use super::dbscan::DbscanStrategy;
use super::geo::GeoPoint;
use crate::config::{AlgorithmChoice, ClusteringConfig};
use crate::error::{ClusterError, Error, Result};

/// A clustering algorithm producing one label per point.
///
/// Implementations:
/// - `HdbscanStrategy`: hierarchical, parameter-light, quadratic spanning tree
/// - `DbscanStrategy`: fixed radius, always available
pub trait ClusterStrategy: Send + Sync {
    /// Name reported in the run summary
    fn name(&self) -> &'static str;

    /// Check whether the strategy can handle `n_points` with its parameters.
    ///
    /// Default accepts everything.
    fn preflight(&self, _n_points: usize) -> std::result::Result<(), ClusterError> {
        Ok(())
    }

    /// Label every point; -1 marks noise
    fn fit(&self, points: &[GeoPoint]) -> std::result::Result<Vec<i32>, ClusterError>;
}

/// Labels plus the strategy that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOutcome {
    pub labels: Vec<i32>,
    pub algorithm: &'static str,
}

/// Runs strategies in order and keeps the first result.
///
/// A strategy that fails its preflight, faults while fitting, or returns the
/// wrong number of labels is skipped in favour of the next one.
pub struct FallbackClusterer {
    strategies: Vec<Box<dyn ClusterStrategy>>,
}

impl FallbackClusterer {
    pub fn new(strategies: Vec<Box<dyn ClusterStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the chain a configuration asks for
    pub fn from_config(config: &ClusteringConfig) -> Self {
        let dbscan = || -> Box<dyn ClusterStrategy> {
            Box::new(DbscanStrategy::new(config.eps, config.min_samples))
        };

        let strategies = match config.algorithm {
            AlgorithmChoice::Auto => {
                let mut chain = hierarchical(config);
                chain.push(dbscan());
                chain
            }
            AlgorithmChoice::Hdbscan => hierarchical(config),
            AlgorithmChoice::Dbscan => vec![dbscan()],
        };

        Self::new(strategies)
    }

    /// Names of the strategies in the order they will be tried
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn cluster(&self, points: &[GeoPoint]) -> Result<ClusterOutcome> {
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            match Self::attempt(strategy.as_ref(), points) {
                Ok(labels) => {
                    info!(
                        "Clustered {} points with {}",
                        points.len(),
                        strategy.name()
                    );
                    return Ok(ClusterOutcome {
                        labels,
                        algorithm: strategy.name(),
                    });
                }
                Err(err) => {
                    warn!("{} unavailable, trying next strategy: {}", strategy.name(), err);
                    failures.push(format!("{}: {}", strategy.name(), err));
                }
            }
        }

        if failures.is_empty() {
            return Err(Error::clustering("no clustering strategy available"));
        }
        Err(Error::clustering(failures.join("; ")))
    }

    fn attempt(
        strategy: &dyn ClusterStrategy,
        points: &[GeoPoint],
    ) -> std::result::Result<Vec<i32>, ClusterError> {
        strategy.preflight(points.len())?;
        debug!(strategy = strategy.name(), points = points.len(), "Running clustering strategy");
        let labels = strategy.fit(points)?;
        if labels.len() != points.len() {
            return Err(ClusterError::LabelCountMismatch {
                expected: points.len(),
                actual: labels.len(),
            });
        }
        Ok(labels)
    }
}

#[cfg(feature = "hdbscan")]
fn hierarchical(config: &ClusteringConfig) -> Vec<Box<dyn ClusterStrategy>> {
    let strategy: Box<dyn ClusterStrategy> = Box::new(super::hdbscan::HdbscanStrategy::new(
        config.min_samples,
        config.hdbscan_max_points,
    ));
    vec![strategy]
}

#[cfg(not(feature = "hdbscan"))]
fn hierarchical(_config: &ClusteringConfig) -> Vec<Box<dyn ClusterStrategy>> {
    debug!("Hierarchical clustering not compiled in");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NOISE_LABEL;

    struct Faulty;

    impl ClusterStrategy for Faulty {
        fn name(&self) -> &'static str {
            "faulty"
        }

        fn fit(&self, _points: &[GeoPoint]) -> std::result::Result<Vec<i32>, ClusterError> {
            Err(ClusterError::invalid_parameter("anything", "always fails"))
        }
    }

    struct Truncating;

    impl ClusterStrategy for Truncating {
        fn name(&self) -> &'static str {
            "truncating"
        }

        fn fit(&self, _points: &[GeoPoint]) -> std::result::Result<Vec<i32>, ClusterError> {
            Ok(vec![0])
        }
    }

    fn scenario_points() -> Vec<GeoPoint> {
        vec![
            GeoPoint::from_degrees(10.0, 10.0),
            GeoPoint::from_degrees(10.0001, 10.0001),
            GeoPoint::from_degrees(50.0, 50.0),
        ]
    }

    #[test]
    fn test_fault_falls_back() {
        let strategies: Vec<Box<dyn ClusterStrategy>> =
            vec![Box::new(Faulty), Box::new(DbscanStrategy::new(0.005, 2))];
        let chain = FallbackClusterer::new(strategies);
        let outcome = chain.cluster(&scenario_points()).unwrap();
        assert_eq!(outcome.algorithm, "dbscan");
        assert_eq!(outcome.labels, vec![0, 0, NOISE_LABEL]);
    }

    #[test]
    fn test_wrong_label_count_falls_back() {
        let strategies: Vec<Box<dyn ClusterStrategy>> =
            vec![Box::new(Truncating), Box::new(DbscanStrategy::new(0.005, 2))];
        let chain = FallbackClusterer::new(strategies);
        assert_eq!(chain.cluster(&scenario_points()).unwrap().algorithm, "dbscan");
    }

    #[test]
    fn test_all_strategies_failing_is_error() {
        let strategies: Vec<Box<dyn ClusterStrategy>> = vec![Box::new(Faulty)];
        let chain = FallbackClusterer::new(strategies);
        let err = chain.cluster(&scenario_points()).unwrap_err();
        assert!(matches!(err, Error::Clustering(_)));
        assert!(err.to_string().contains("faulty"));

        let empty = FallbackClusterer::new(Vec::new());
        assert!(empty.cluster(&scenario_points()).is_err());
    }

    #[test]
    fn test_dbscan_only_chain() {
        let config = ClusteringConfig {
            algorithm: AlgorithmChoice::Dbscan,
            ..ClusteringConfig::default()
        };
        assert_eq!(FallbackClusterer::from_config(&config).strategy_names(), vec!["dbscan"]);
    }

    #[cfg(feature = "hdbscan")]
    #[test]
    fn test_auto_chain_prefers_hierarchical() {
        let config = ClusteringConfig {
            min_samples: 2,
            ..ClusteringConfig::default()
        };
        let chain = FallbackClusterer::from_config(&config);
        assert_eq!(chain.strategy_names(), vec!["hdbscan", "dbscan"]);

        let outcome = chain.cluster(&scenario_points()).unwrap();
        assert_eq!(outcome.algorithm, "hdbscan");
        assert_eq!(outcome.labels, vec![0, 0, NOISE_LABEL]);
    }

    #[cfg(feature = "hdbscan")]
    #[test]
    fn test_auto_chain_falls_back_when_over_budget() {
        let config = ClusteringConfig {
            min_samples: 2,
            hdbscan_max_points: 2,
            ..ClusteringConfig::default()
        };
        let outcome = FallbackClusterer::from_config(&config)
            .cluster(&scenario_points())
            .unwrap();
        assert_eq!(outcome.algorithm, "dbscan");
        assert_eq!(outcome.labels, vec![0, 0, NOISE_LABEL]);
    }

    #[cfg(feature = "hdbscan")]
    #[test]
    fn test_default_budget_sends_full_sample_to_dbscan() {
        let config = ClusteringConfig::default();
        let sampled = crate::config::SamplingConfig::default().max_points;
        let hierarchical = crate::clustering::HdbscanStrategy::new(
            config.min_samples,
            config.hdbscan_max_points,
        );

        assert!(matches!(
            hierarchical.preflight(sampled),
            Err(ClusterError::TooManyPoints { .. })
        ));
        assert!(hierarchical.preflight(config.hdbscan_max_points).is_ok());
    }

    #[cfg(feature = "hdbscan")]
    #[test]
    fn test_auto_chain_falls_back_for_min_samples_one() {
        let config = ClusteringConfig {
            min_samples: 1,
            ..ClusteringConfig::default()
        };
        let outcome = FallbackClusterer::from_config(&config)
            .cluster(&scenario_points())
            .unwrap();
        assert_eq!(outcome.algorithm, "dbscan");
        // Every point is its own core with min_samples 1
        assert_eq!(outcome.labels, vec![0, 0, 1]);
    }

    #[cfg(feature = "hdbscan")]
    #[test]
    fn test_forced_hierarchical_fault_is_fatal() {
        let config = ClusteringConfig {
            min_samples: 2,
            algorithm: AlgorithmChoice::Hdbscan,
            hdbscan_max_points: 1,
            ..ClusteringConfig::default()
        };
        assert!(FallbackClusterer::from_config(&config)
            .cluster(&scenario_points())
            .is_err());
    }

    #[test]
    fn test_empty_input_clusters_to_nothing() {
        let outcome = FallbackClusterer::from_config(&ClusteringConfig::default())
            .cluster(&[])
            .unwrap();
        assert!(outcome.labels.is_empty());
        assert_eq!(outcome.algorithm, "dbscan");
    }
}
