use crate::data::Batch;
use crate::math::Matrix;
use crate::network::{OnsetNetwork, ParameterGroup};
use crate::optim::Sgd;

/// Seam for the external gradient engine.
///
/// `configure` is called once, after initialization and before the first
/// batch, with the optimizer hyperparameters and the weight-decay groups.
/// `apply` is then called once per training batch after the forward pass
/// with the batch, its logits, the weighted loss and the scheduled
/// learning rate. An implementation owns gradient computation and the
/// optimizer state.
pub trait ParameterUpdate {
    fn configure(&mut self, _settings: &Sgd, _groups: &[ParameterGroup]) {}

    fn apply(&mut self, network: &mut OnsetNetwork, batch: &Batch, logits: &Matrix, loss: f32, lr: f64);
}

/// Leaves the parameters untouched. Training passes then only advance
/// the batch-norm running statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrozenParameters;

impl ParameterUpdate for FrozenParameters {
    fn apply(&mut self, _network: &mut OnsetNetwork, _batch: &Batch, _logits: &Matrix, _loss: f32, _lr: f64) {}
}
