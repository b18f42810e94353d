use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::{OnsetError, Result};
use crate::layers::{blur_pool::BlurPool1d, conv1d::Conv1d, norm::{Norm, NormKind}, regularize};
use crate::math::{ops, InitScheme, Initializable, Tensor};
use crate::network::params::ParamInfo;
use crate::network::Phase;

/// Shape and regularization of one residual block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSpec {
    pub c_in: usize,
    pub c_out: usize,
    pub expand: usize,
    pub stride: usize,
    pub project: bool,
    pub norm: NormKind,
    pub blur_kernel_size: usize,
    /// Stochastic depth rate; `0.0` disables it.
    pub drop_rate: f32,
}

/// Pre-activation residual block:
/// norm -> relu -> [blur pool] -> conv -> norm -> relu -> conv -> [+ input].
///
/// Blocks that downsample or project return the branch without a skip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResnetBlock {
    pub norm1: Norm,
    pub blur_pool: Option<BlurPool1d>,
    pub conv1: Conv1d,
    pub norm2: Norm,
    pub conv2: Conv1d,
    pub stride: usize,
    pub project: bool,
    pub drop_rate: f32,
}

impl ResnetBlock {
    pub fn new(spec: BlockSpec) -> Result<ResnetBlock> {
        let blur_pool = match spec.stride {
            1 => None,
            2 => Some(BlurPool1d::new(spec.c_in, spec.blur_kernel_size)?),
            other => return Err(OnsetError::UnsupportedStride(other)),
        };
        let hidden = spec.expand * spec.c_in;

        Ok(ResnetBlock {
            norm1: Norm::new(spec.norm, spec.c_in),
            blur_pool,
            conv1: Conv1d::new(spec.c_in, hidden, 3, 1, false),
            norm2: Norm::new(spec.norm, hidden),
            conv2: Conv1d::new(hidden, spec.c_out, 3, 1, false),
            stride: spec.stride,
            project: spec.project,
            drop_rate: spec.drop_rate,
        })
    }

    /// Whether the block adds its input back onto the branch.
    pub fn has_skip(&self) -> bool {
        self.stride == 1 && !self.project
    }

    pub fn forward(&mut self, input: &Tensor, phase: &mut Phase) -> Tensor {
        let training = phase.is_training();

        let mut x = self.norm1.forward(input, training);
        x.map_inplace(ops::relu);
        if let Some(pool) = &self.blur_pool {
            x = pool.forward(&x);
        }
        x = self.conv1.forward(&x);
        x = self.norm2.forward(&x, training);
        x.map_inplace(ops::relu);
        x = self.conv2.forward(&x);

        if !self.has_skip() {
            return x;
        }

        if self.drop_rate > 0.0 {
            if let Phase::Train(rng) = phase {
                regularize::drop_connect(&mut x, self.drop_rate, &mut **rng);
            }
        }

        x + input.clone()
    }

    pub fn initialize<R: Rng + ?Sized>(&mut self, scheme: InitScheme, rng: &mut R) {
        self.norm1.reset_parameters();
        self.norm2.reset_parameters();
        self.conv1.initialize(scheme, rng);
        self.conv2.initialize(scheme, rng);
    }

    pub fn collect_params(&self, prefix: &str, out: &mut Vec<ParamInfo>) {
        self.norm1.collect_params(&format!("{prefix}.norm1"), out);
        self.conv1.collect_params(&format!("{prefix}.conv1"), out);
        self.norm2.collect_params(&format!("{prefix}.norm2"), out);
        self.conv2.collect_params(&format!("{prefix}.conv2"), out);
    }

    /// Convolution weights only; the norms are left out.
    pub fn collect_conv_values(&self, prefix: &str, out: &mut Vec<(String, Vec<f32>)>) {
        self.conv1.collect_values(&format!("{prefix}.conv1"), out);
        self.conv2.collect_values(&format!("{prefix}.conv2"), out);
    }
}
