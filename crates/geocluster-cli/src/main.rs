//! geocluster: cluster geocoded events by great-circle density
//!
//! Reads a delimited event table, writes every (possibly subsampled) point with
//! its cluster label as a JSON array, and prints a one-line JSON summary on
//! stdout. Logs go to stderr.
//!
//! Run with: cargo run -p geocluster-cli -- --input events.csv --min-samples 5

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use geocluster_core::{AlgorithmChoice, Pipeline, PipelineConfig, TextEncoding};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Density clustering of geocoded event tables
#[derive(Parser, Debug)]
#[command(name = "geocluster")]
#[command(author, version, about)]
struct Cli {
    /// Source table [default: globalterrorismdb_0718dist.csv]
    #[arg(long)]
    input: Option<PathBuf>,

    /// Destination JSON array [default: clusters_data.json]
    #[arg(long)]
    output: Option<PathBuf>,

    /// Fixed-radius neighborhood, radians [default: 0.005]
    #[arg(long)]
    eps: Option<f64>,

    /// Minimum neighborhood size, also the minimum cluster size [default: 10]
    #[arg(long)]
    min_samples: Option<usize>,

    /// Subsampling budget [default: 80000]
    #[arg(long)]
    max_points: Option<usize>,

    /// TOML configuration file; flags given here override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Clustering strategy [default: auto]
    #[arg(long, value_enum)]
    algorithm: Option<AlgorithmArg>,

    /// Largest input the hierarchical strategy accepts [default: 20000]
    #[arg(long)]
    hdbscan_max_points: Option<usize>,

    /// Field delimiter [default: ,]
    #[arg(long)]
    delimiter: Option<char>,

    /// Text encoding of the source table [default: latin1]
    #[arg(long, value_enum)]
    encoding: Option<EncodingArg>,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AlgorithmArg {
    Auto,
    Hdbscan,
    Dbscan,
}

impl From<AlgorithmArg> for AlgorithmChoice {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Auto => AlgorithmChoice::Auto,
            AlgorithmArg::Hdbscan => AlgorithmChoice::Hdbscan,
            AlgorithmArg::Dbscan => AlgorithmChoice::Dbscan,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EncodingArg {
    Latin1,
    Utf8,
}

impl From<EncodingArg> for TextEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Latin1 => TextEncoding::Latin1,
            EncodingArg::Utf8 => TextEncoding::Utf8,
        }
    }
}

impl Cli {
    /// Defaults, then the config file, then explicit flags
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let config = PipelineConfig::from_toml_file(path).with_context(|| {
                    format!("Failed to load configuration from {}", path.display())
                })?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => {
                info!("Using built-in configuration defaults");
                PipelineConfig::default()
            }
        };

        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(eps) = self.eps {
            config.clustering.eps = eps;
        }
        if let Some(min_samples) = self.min_samples {
            config.clustering.min_samples = min_samples;
        }
        if let Some(max_points) = self.max_points {
            config.sampling.max_points = max_points;
        }
        if let Some(algorithm) = self.algorithm {
            config.clustering.algorithm = algorithm.into();
        }
        if let Some(limit) = self.hdbscan_max_points {
            config.clustering.hdbscan_max_points = limit;
        }
        if let Some(delimiter) = self.delimiter {
            config.loader.delimiter = delimiter;
        }
        if let Some(encoding) = self.encoding {
            config.loader.encoding = encoding.into();
        }

        Ok(config)
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet {
        "warn"
    } else {
        "geocluster=info,geocluster_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<String> {
    let config = cli.into_config()?;
    let input = config.input.clone();

    let pipeline = Pipeline::new(config).context("Invalid configuration")?;
    let resolved = pipeline.config();
    info!(
        "Clustering {} into {} (algorithm {:?}, eps {}, min_samples {}, max_points {})",
        resolved.input.display(),
        resolved.output.display(),
        resolved.clustering.algorithm,
        resolved.clustering.eps,
        resolved.clustering.min_samples,
        resolved.sampling.max_points
    );

    let summary = pipeline
        .run()
        .with_context(|| format!("Failed to cluster {}", input.display()))?;

    Ok(summary.to_json_line()?)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    match run(cli) {
        Ok(line) => {
            println!("{}", line);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{:#}", err);
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}
