use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::data::DataPaths;
use crate::error::Result;
use crate::network::NetworkConfig;
use crate::optim::{Sgd, StepLr};

/// Everything one run needs: architecture, optimization settings, data
/// locations and the seed.
///
/// # Fields
/// - `epochs`            — full passes over the training split
/// - `batch_size`        — examples per batch for every split
/// - `log_every_n_steps` — training scalars are reported every n batches
/// - `checkpoint_dir`    — receives the best snapshot by validation AUC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub seed: u64,
    pub epochs: usize,
    pub batch_size: usize,
    pub log_every_n_steps: usize,
    pub network: NetworkConfig,
    pub optimizer: Sgd,
    pub schedule: StepLr,
    pub data: DataPaths,
    pub checkpoint_dir: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        let optimizer = Sgd::default();
        ExperimentConfig {
            seed: 0,
            epochs: 75,
            batch_size: 16,
            log_every_n_steps: 5,
            network: NetworkConfig::variant_a(),
            schedule: StepLr::new(optimizer.learning_rate, 15, 0.5),
            optimizer,
            data: DataPaths::default(),
            checkpoint_dir: PathBuf::from("checkpoint"),
        }
    }
}

impl ExperimentConfig {
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Missing fields fall back to `Default`.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<ExperimentConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
