//! The batch run: load, sample, cluster, write

use std::time::Instant;
use tracing::info;

use crate::clustering::{ClusterOutcome, FallbackClusterer, GeoPoint};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::export::{write_points, Summary};
use crate::ingestion::TableLoader;
use crate::sampler::Sampler;
use crate::types::{ClusteredPoint, EventRecord};

/// One configured invocation of the clustering pipeline
pub struct Pipeline {
    config: PipelineConfig,
    loader: TableLoader,
    sampler: Sampler,
    clusterer: FallbackClusterer,
}

impl Pipeline {
    /// Validate the configuration and assemble the stages
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let clusterer = FallbackClusterer::from_config(&config.clustering);
        if clusterer.strategy_names().is_empty() {
            return Err(Error::config(
                "hdbscan was requested but this build does not include it",
            ));
        }

        Ok(Self {
            loader: TableLoader::new(config.loader.clone()),
            sampler: Sampler::new(config.sampling.max_points),
            clusterer,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage and write the output file.
    ///
    /// The output is only created once clustering has succeeded.
    pub fn run(&self) -> Result<Summary> {
        let started = Instant::now();

        let stage = Instant::now();
        let (dataset, _report) = self.loader.load_path(&self.config.input)?;
        info!("Load finished in {:.2}s", stage.elapsed().as_secs_f64());

        let stage = Instant::now();
        let records = self.sampler.sample(dataset.records);
        info!(
            "Sampling finished in {:.2}s ({} points)",
            stage.elapsed().as_secs_f64(),
            records.len()
        );

        let stage = Instant::now();
        let (points, algorithm) = self.cluster(records)?;
        info!(
            "Clustering finished in {:.2}s using {}",
            stage.elapsed().as_secs_f64(),
            algorithm
        );

        let stage = Instant::now();
        write_points(&self.config.output, &points)?;
        info!("Write finished in {:.2}s", stage.elapsed().as_secs_f64());

        let summary = Summary::from_points(&points, algorithm);
        info!(
            "Run finished in {:.2}s: {} points, {} clusters, {} noise",
            started.elapsed().as_secs_f64(),
            summary.points,
            summary.clusters,
            summary.noise
        );
        Ok(summary)
    }

    /// Label records in memory without touching the filesystem
    pub fn cluster(&self, records: Vec<EventRecord>) -> Result<(Vec<ClusteredPoint>, &'static str)> {
        let geo: Vec<GeoPoint> = records.iter().map(GeoPoint::from_record).collect();
        let ClusterOutcome { labels, algorithm } = self.clusterer.cluster(&geo)?;

        let points = records
            .into_iter()
            .zip(labels)
            .map(|(record, cluster_id)| ClusteredPoint { record, cluster_id })
            .collect();
        Ok((points, algorithm))
    }
}
