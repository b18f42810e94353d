use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::math::{init, ops, InitScheme, Initializable, Tensor};
use crate::network::params::{ParamInfo, ParamKind};

/// Learned 1-D convolution. Weights are zero until `initialize` runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv1d {
    /// `[out, in / groups, kernel]`
    pub weight: Tensor,
    pub bias: Option<Vec<f32>>,
    pub stride: usize,
    pub padding: usize,
    pub groups: usize,
}

impl Conv1d {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        padding: usize,
        bias: bool,
    ) -> Conv1d {
        Conv1d::grouped(in_channels, out_channels, kernel_size, padding, 1, bias)
    }

    pub fn grouped(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        padding: usize,
        groups: usize,
        bias: bool,
    ) -> Conv1d {
        Conv1d {
            weight: Tensor::zeros(out_channels, in_channels / groups, kernel_size),
            bias: bias.then(|| vec![0.0; out_channels]),
            stride: 1,
            padding,
            groups,
        }
    }

    pub fn in_channels(&self) -> usize {
        self.weight.channels * self.groups
    }

    pub fn out_channels(&self) -> usize {
        self.weight.batch
    }

    pub fn forward(&self, input: &Tensor) -> Tensor {
        ops::conv1d(input, &self.weight, self.bias.as_deref(), self.stride, self.padding, self.groups)
    }

    pub fn collect_params(&self, prefix: &str, out: &mut Vec<ParamInfo>) {
        out.push(ParamInfo::new(format!("{prefix}.weight"), self.weight.data.len(), ParamKind::Weight));
        if let Some(bias) = &self.bias {
            out.push(ParamInfo::new(format!("{prefix}.bias"), bias.len(), ParamKind::Bias));
        }
    }

    /// Current values under the same names as `collect_params`.
    pub fn collect_values(&self, prefix: &str, out: &mut Vec<(String, Vec<f32>)>) {
        out.push((format!("{prefix}.weight"), self.weight.data.clone()));
        if let Some(bias) = &self.bias {
            out.push((format!("{prefix}.bias"), bias.clone()));
        }
    }
}

impl Initializable for Conv1d {
    fn initialize<R: Rng + ?Sized>(&mut self, scheme: InitScheme, rng: &mut R) {
        let (out, in_per_group, kernel) = self.weight.shape();
        init::fill(&mut self.weight.data, in_per_group * kernel, out * kernel, scheme, rng);
        if let Some(bias) = self.bias.as_mut() {
            bias.iter_mut().for_each(|b| *b = 0.0);
        }
    }
}

/// Convolution with weight normalization: `w = g * v / ||v||` per output channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightNormConv1d {
    /// Direction `v`; its bias is the layer bias.
    pub direction: Conv1d,
    /// Magnitude `g`, one per output channel.
    pub gain: Vec<f32>,
}

impl WeightNormConv1d {
    pub fn new(direction: Conv1d) -> WeightNormConv1d {
        let gain = direction.weight.slab_norms();
        WeightNormConv1d { direction, gain }
    }

    pub fn effective_weight(&self) -> Tensor {
        let mut weight = self.direction.weight.clone();
        let norms = weight.slab_norms();
        for (o, (g, norm)) in self.gain.iter().zip(norms).enumerate() {
            let scale = if norm > 0.0 { g / norm } else { 0.0 };
            weight.example_mut(o).iter_mut().for_each(|w| *w *= scale);
        }
        weight
    }

    pub fn out_channels(&self) -> usize {
        self.direction.out_channels()
    }

    pub fn forward(&self, input: &Tensor) -> Tensor {
        let conv = &self.direction;
        ops::conv1d(
            input,
            &self.effective_weight(),
            conv.bias.as_deref(),
            conv.stride,
            conv.padding,
            conv.groups,
        )
    }

    pub fn collect_params(&self, prefix: &str, out: &mut Vec<ParamInfo>) {
        out.push(ParamInfo::new(format!("{prefix}.weight_g"), self.gain.len(), ParamKind::Gain));
        out.push(ParamInfo::new(
            format!("{prefix}.weight_v"),
            self.direction.weight.data.len(),
            ParamKind::Weight,
        ));
        if let Some(bias) = &self.direction.bias {
            out.push(ParamInfo::new(format!("{prefix}.bias"), bias.len(), ParamKind::Bias));
        }
    }

    pub fn collect_values(&self, prefix: &str, out: &mut Vec<(String, Vec<f32>)>) {
        out.push((format!("{prefix}.weight_g"), self.gain.clone()));
        out.push((format!("{prefix}.weight_v"), self.direction.weight.data.clone()));
        if let Some(bias) = &self.direction.bias {
            out.push((format!("{prefix}.bias"), bias.clone()));
        }
    }
}

impl Initializable for WeightNormConv1d {
    /// Redraws the direction and resets the magnitude to its norm, so the
    /// effective weight equals the freshly drawn tensor.
    fn initialize<R: Rng + ?Sized>(&mut self, scheme: InitScheme, rng: &mut R) {
        self.direction.initialize(scheme, rng);
        self.gain = self.direction.weight.slab_norms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn initialize_zeroes_bias_and_fills_weight() {
        let mut conv = Conv1d::new(2, 3, 3, 1, true);
        conv.bias = Some(vec![1.0; 3]);
        conv.initialize(InitScheme::KaimingNormal, &mut ChaCha8Rng::seed_from_u64(0));

        assert_eq!(conv.bias, Some(vec![0.0; 3]));
        assert!(conv.weight.data.iter().any(|&w| w != 0.0));
        assert_eq!((conv.in_channels(), conv.out_channels()), (2, 3));
    }

    #[test]
    fn weight_norm_reproduces_direction_after_init() {
        let mut layer = WeightNormConv1d::new(Conv1d::grouped(2, 8, 1, 0, 2, true));
        layer.initialize(InitScheme::XavierUniform, &mut ChaCha8Rng::seed_from_u64(3));

        let effective = layer.effective_weight();
        for (a, b) in effective.data.iter().zip(layer.direction.weight.data.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }

        layer.gain.iter_mut().for_each(|g| *g *= 2.0);
        let doubled = layer.effective_weight();
        assert_abs_diff_eq!(doubled.data[0], 2.0 * layer.direction.weight.data[0], epsilon = 1e-6);
    }
}
