use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::network::OnsetNetwork;

/// Keeps the single best network snapshot by validation AUC (higher is
/// better).
#[derive(Debug)]
pub struct CheckpointManager {
    dir: PathBuf,
    best: Option<(f64, PathBuf)>,
}

impl CheckpointManager {
    /// Creates `dir` if it does not exist.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<CheckpointManager> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(CheckpointManager { dir, best: None })
    }

    /// Saves `network` if `metric` beats the best seen so far, replacing
    /// the previous best file. Returns whether a snapshot was written.
    pub fn offer(&mut self, epoch: usize, metric: Option<f64>, network: &OnsetNetwork) -> Result<bool> {
        let Some(metric) = metric else {
            return Ok(false);
        };
        if matches!(self.best, Some((best, _)) if metric <= best) {
            return Ok(false);
        }

        let path = self.dir.join(format!("epoch={epoch}-val_auc={metric:.4}.json"));
        network.save_json(&path)?;
        info!(epoch, val_auc = metric, path = %path.display(), "saved best checkpoint");

        if let Some((_, previous)) = self.best.replace((metric, path)) {
            if let Err(err) = fs::remove_file(&previous) {
                warn!(path = %previous.display(), %err, "could not remove previous checkpoint");
            }
        }
        Ok(true)
    }

    pub fn best_model_path(&self) -> Option<&Path> {
        self.best.as_ref().map(|(_, path)| path.as_path())
    }

    pub fn best_metric(&self) -> Option<f64> {
        self.best.as_ref().map(|(metric, _)| *metric)
    }
}
