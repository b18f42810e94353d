use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::network::NetworkConfig;
use crate::train::ExperimentConfig;

/// Train and evaluate the onset-detection residual network
#[derive(Parser, Debug)]
#[command(name = "onset-resnet")]
#[command(version)]
pub struct Cli {
    /// Seed for the run RNG (initialization, shuffling, regularizers).
    /// Defaults to the configuration's seed
    #[arg(short = 'S', long, global = true)]
    pub seed: Option<u64>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Experiment configuration (JSON); flags below override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Architecture preset
    #[arg(long, value_enum, global = true)]
    pub variant: Option<Variant>,

    /// Directory holding train.npy, val.npy, test_inps.p and test_labels.p
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Where the best checkpoint is written
    #[arg(long, global = true)]
    pub checkpoint_dir: Option<PathBuf>,

    /// Number of training epochs
    #[arg(long, global = true)]
    pub epochs: Option<usize>,

    /// Batch size for every split
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a saved checkpoint on the test split
    Evaluate {
        /// Checkpoint written by a training run
        #[arg(long)]
        checkpoint: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    A,
    B,
}

impl Variant {
    pub fn network_config(self) -> NetworkConfig {
        match self {
            Variant::A => NetworkConfig::variant_a(),
            Variant::B => NetworkConfig::variant_b(),
        }
    }
}

impl Cli {
    /// Applies the command-line overrides on top of `base`.
    pub fn apply(&self, mut base: ExperimentConfig) -> ExperimentConfig {
        if let Some(seed) = self.seed {
            base.seed = seed;
        }
        if let Some(variant) = self.variant {
            base.network = variant.network_config();
        }
        if let Some(dir) = &self.data_dir {
            base.data = crate::data::DataPaths::in_dir(dir);
        }
        if let Some(dir) = &self.checkpoint_dir {
            base.checkpoint_dir = dir.clone();
        }
        if let Some(epochs) = self.epochs {
            base.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            base.batch_size = batch_size;
        }
        base
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

/// `RUST_LOG` wins when set; otherwise `debug` with `--verbose`, else `info`.
pub fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
