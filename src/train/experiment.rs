use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use crate::data::{BatchIter, OnsetDataset, Splits};
use crate::error::{OnsetError, Result};
use crate::loss::CrossEntropyLoss;
use crate::math::Matrix;
use crate::network::{OnsetNetwork, Phase};
use crate::optim::ParameterUpdate;
use crate::train::accumulator::EvalAccumulator;
use crate::train::checkpoint::CheckpointManager;
use crate::train::epoch_stats::{EpochReport, Split};
use crate::train::reporter::Reporter;
use crate::train::train_config::ExperimentConfig;

/// Outcome of `Experiment::run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    /// Mean weighted training loss per epoch.
    pub train_losses: Vec<f64>,
    /// Validation report per epoch.
    pub validation: Vec<EpochReport>,
    pub best_checkpoint: Option<PathBuf>,
    pub best_val_auc: Option<f64>,
    pub test: EpochReport,
}

/// One seeded run: owns the network, the run RNG and the collaborators
/// that update parameters and receive telemetry.
pub struct Experiment<U, R> {
    config: ExperimentConfig,
    network: OnsetNetwork,
    rng: ChaCha8Rng,
    updater: U,
    reporter: R,
    global_step: usize,
}

impl<U: ParameterUpdate, R: Reporter> Experiment<U, R> {
    /// Seeds the run RNG, builds the network, initializes its weights and
    /// hands the optimizer settings and parameter groups to `updater`.
    pub fn new(config: ExperimentConfig, mut updater: U, reporter: R) -> Result<Experiment<U, R>> {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut network = OnsetNetwork::new(&config.network)?;
        network.init(&mut rng);

        let groups = network.parameter_groups(config.optimizer.weight_decay);
        for (i, group) in groups.iter().enumerate() {
            debug!(group = i, weight_decay = group.weight_decay, tensors = group.params.len(), numel = group.numel(), "parameter group");
        }
        updater.configure(&config.optimizer, &groups);

        Ok(Experiment { config, network, rng, updater, reporter, global_step: 0 })
    }

    pub fn network(&self) -> &OnsetNetwork {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut OnsetNetwork {
        &mut self.network
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Trains for `config.epochs`, checkpointing on validation AUC, then
    /// evaluates the test split with the best checkpoint.
    pub fn run(&mut self, splits: &Splits) -> Result<ExperimentSummary> {
        info!(
            network = %self.config.network.name,
            seed = self.config.seed,
            epochs = self.config.epochs,
            "starting run"
        );
        let mut checkpoints = CheckpointManager::new(&self.config.checkpoint_dir)?;
        let mut train_losses = Vec::with_capacity(self.config.epochs);
        let mut validation = Vec::with_capacity(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            let t_start = Instant::now();
            let train_loss = self.train_epoch(epoch, &splits.train)?;
            train_losses.push(train_loss);

            let report = self.evaluate(epoch, Split::Valid, &splits.valid)?;
            for (name, values) in self.network.conv_and_fc_values() {
                self.reporter.histogram(&name, &values, self.global_step);
            }
            checkpoints.offer(epoch, report.auc, &self.network)?;

            info!(
                epoch,
                train_loss,
                val_loss = report.loss,
                val_auc = ?report.auc,
                elapsed_ms = t_start.elapsed().as_millis() as u64,
                "epoch complete"
            );
            validation.push(report);
        }

        let best_checkpoint = checkpoints.best_model_path().map(Path::to_path_buf);
        let test = match &best_checkpoint {
            Some(path) => {
                info!(path = %path.display(), "testing best checkpoint");
                let report = evaluate_checkpoint(path, &splits.test, self.config.batch_size, Split::Test)?;
                publish(&mut self.reporter, self.global_step, &report);
                report
            }
            None => {
                warn!("no checkpoint was saved, testing the final network");
                self.evaluate(0, Split::Test, &splits.test)?
            }
        };

        Ok(ExperimentSummary {
            train_losses,
            validation,
            best_checkpoint,
            best_val_auc: checkpoints.best_metric(),
            test,
        })
    }

    /// One shuffled pass in training phase. Returns the mean batch loss.
    pub fn train_epoch(&mut self, epoch: usize, dataset: &OnsetDataset) -> Result<f64> {
        let lr = self.config.schedule.lr_at(epoch - 1);
        let batches = BatchIter::shuffled(dataset, self.config.batch_size, true, &mut self.rng);
        let mut total = 0.0;
        let mut count = 0usize;

        for batch in batches {
            let logits = self.network.forward(&batch.inputs, &mut Phase::Train(&mut self.rng));
            ensure_finite(&logits)?;
            let loss = CrossEntropyLoss::weighted(&logits, &batch.labels, &batch.weights);

            self.updater.apply(&mut self.network, &batch, &logits, loss, lr);

            self.global_step += 1;
            if self.global_step % self.config.log_every_n_steps.max(1) == 0 {
                self.reporter.scalar("train_loss", loss as f64, self.global_step);
                self.reporter.scalar("lr", lr, self.global_step);
                self.reporter.scalar("momentum", self.config.optimizer.momentum, self.global_step);
            }

            total += loss as f64;
            count += 1;
        }

        if count == 0 {
            warn!(epoch, examples = dataset.len(), "training split smaller than one batch");
            return Ok(0.0);
        }
        Ok(total / count as f64)
    }

    /// Evaluates the run's network on `dataset` and reports the result.
    pub fn evaluate(&mut self, epoch: usize, split: Split, dataset: &OnsetDataset) -> Result<EpochReport> {
        let acc = evaluate(&mut self.network, dataset, self.config.batch_size, EvalAccumulator::new(split))?;
        let report = acc.finish(epoch);
        publish(&mut self.reporter, self.global_step, &report);
        Ok(report)
    }
}

fn publish<R: Reporter>(reporter: &mut R, step: usize, report: &EpochReport) {
    let prefix = report.split.prefix();
    reporter.scalar(&format!("{prefix}_loss"), report.loss, step);
    if let Some(auc) = report.auc {
        reporter.scalar(&format!("{prefix}_auc"), auc, step);
    }
    if let Some(cm) = &report.confusion {
        let title = match report.split {
            Split::Test => "Confusion Matrix - Test".to_string(),
            _ => format!("Confusion Matrix - Epoch {}", report.epoch),
        };
        reporter.confusion_matrix(&title, cm);
    }
}

/// Runs `network` over `dataset` in evaluation phase, recording every
/// batch into `acc`, and hands the accumulator back.
pub fn evaluate(
    network: &mut OnsetNetwork,
    dataset: &OnsetDataset,
    batch_size: usize,
    mut acc: EvalAccumulator,
) -> Result<EvalAccumulator> {
    for batch in BatchIter::sequential(dataset, batch_size) {
        let logits = network.forward(&batch.inputs, &mut Phase::Eval);
        ensure_finite(&logits)?;
        let loss = CrossEntropyLoss::weighted(&logits, &batch.labels, &batch.weights);
        acc.push(&logits, &batch.labels, loss);
    }
    Ok(acc)
}

/// Loads a snapshot written by `CheckpointManager` and evaluates it.
pub fn evaluate_checkpoint<P: AsRef<Path>>(
    path: P,
    dataset: &OnsetDataset,
    batch_size: usize,
    split: Split,
) -> Result<EpochReport> {
    let mut network = OnsetNetwork::load_json(path)?;
    let acc = evaluate(&mut network, dataset, batch_size, EvalAccumulator::new(split))?;
    Ok(acc.finish(0))
}

fn ensure_finite(logits: &Matrix) -> Result<()> {
    if logits.is_finite() {
        Ok(())
    } else {
        Err(OnsetError::NonFiniteOutput)
    }
}
