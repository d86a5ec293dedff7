//! Configuration for the clustering pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Seed for the subsampling generator. Fixed so repeated runs select the same rows.
pub const SAMPLE_SEED: u64 = 42;

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Source table
    pub input: PathBuf,
    /// Destination JSON array
    pub output: PathBuf,
    /// Table reading configuration
    pub loader: LoaderConfig,
    /// Subsampling configuration
    pub sampling: SamplingConfig,
    /// Clustering configuration
    pub clustering: ClusteringConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("globalterrorismdb_0718dist.csv"),
            output: PathBuf::from("clusters_data.json"),
            loader: LoaderConfig::default(),
            sampling: SamplingConfig::default(),
            clustering: ClusteringConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file. Keys not present keep their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reject parameter combinations no stage can work with
    pub fn validate(&self) -> Result<()> {
        let eps = self.clustering.eps;
        if !eps.is_finite() || eps <= 0.0 {
            return Err(Error::config(format!(
                "eps must be a positive finite radius in radians, got {}",
                eps
            )));
        }
        if self.clustering.min_samples == 0 {
            return Err(Error::config("min_samples must be at least 1"));
        }
        if self.sampling.max_points == 0 {
            return Err(Error::config("max_points must be at least 1"));
        }
        if !self.loader.delimiter.is_ascii() {
            return Err(Error::config(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.loader.delimiter
            )));
        }
        Ok(())
    }
}

/// Text encoding of the source table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// ISO-8859-1: every byte is the code point of the same value
    #[default]
    Latin1,
    /// UTF-8, invalid sequences replaced
    Utf8,
}

/// Table reading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Field delimiter
    pub delimiter: char,
    /// Text encoding
    pub encoding: TextEncoding,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            encoding: TextEncoding::Latin1,
        }
    }
}

/// Subsampling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Maximum number of points fed to the clusterer
    pub max_points: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { max_points: 80_000 }
    }
}

/// Which clustering strategies may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmChoice {
    /// Hierarchical first, fixed-radius if it is unavailable or faults
    #[default]
    Auto,
    /// Hierarchical only; a fault is fatal
    Hdbscan,
    /// Fixed-radius only
    Dbscan,
}

/// Clustering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Fixed-radius neighborhood, radians
    pub eps: f64,
    /// Minimum neighborhood size (fixed-radius) and minimum cluster size (hierarchical)
    pub min_samples: usize,
    /// Strategy selection
    pub algorithm: AlgorithmChoice,
    /// Largest input the hierarchical strategy accepts (its spanning tree is quadratic in time)
    pub hdbscan_max_points: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            eps: 0.005,
            min_samples: 10,
            algorithm: AlgorithmChoice::Auto,
            hdbscan_max_points: 20_000,
        }
    }
}
