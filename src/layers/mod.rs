pub mod blur_pool;
pub mod conv1d;
pub mod linear;
pub mod norm;
pub mod regularize;
pub mod residual_block;

pub use blur_pool::BlurPool1d;
pub use conv1d::{Conv1d, WeightNormConv1d};
pub use linear::Linear;
pub use norm::{BatchNorm1d, GroupNorm, Norm, NormKind};
pub use residual_block::{BlockSpec, ResnetBlock};
