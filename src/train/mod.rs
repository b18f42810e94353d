pub mod accumulator;
pub mod checkpoint;
pub mod epoch_stats;
pub mod experiment;
pub mod reporter;
pub mod train_config;

pub use accumulator::EvalAccumulator;
pub use checkpoint::CheckpointManager;
pub use epoch_stats::{EpochReport, Split};
pub use experiment::{evaluate, evaluate_checkpoint, Experiment, ExperimentSummary};
pub use reporter::{Reporter, TracingReporter};
pub use train_config::ExperimentConfig;
