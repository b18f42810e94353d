pub mod cli;
pub mod data;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod metrics;
pub mod network;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use data::{OnsetDataset, Splits};
pub use error::{OnsetError, Result};
pub use math::{Matrix, Tensor};
pub use network::{NetworkConfig, OnsetNetwork, Phase};
pub use optim::{FrozenParameters, ParameterUpdate};
pub use train::{Experiment, ExperimentConfig, ExperimentSummary, Reporter, TracingReporter};
