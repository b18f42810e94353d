use std::path::Path;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::layers::{
    conv1d::{Conv1d, WeightNormConv1d},
    linear::Linear,
    norm::Norm,
    regularize,
    residual_block::{BlockSpec, ResnetBlock},
};
use crate::math::{ops, Initializable, Matrix, Tensor};
use crate::network::config::{HeadExpansion, Jitter, NetworkConfig, NUM_CLASSES};
use crate::network::params::{group_parameters, ParamInfo, ParameterGroup};

/// Whether a forward pass is training (random regularizers active, batch
/// statistics updated) or evaluation (deterministic).
pub enum Phase<'a> {
    Train(&'a mut ChaCha8Rng),
    Eval,
}

impl Phase<'_> {
    pub fn is_training(&self) -> bool {
        matches!(self, Phase::Train(_))
    }
}

/// 1-D residual network mapping `[batch, 10, time]` sequences to two
/// logits (no-onset, onset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnsetNetwork {
    pub config: NetworkConfig,
    pub conv_stem: Conv1d,
    pub blocks: Vec<ResnetBlock>,
    pub norm_head: Norm,
    pub head_expand: Option<WeightNormConv1d>,
    pub fc: Linear,
}

impl OnsetNetwork {
    /// Builds the layer stack. Weights stay zero until `init` is called.
    pub fn new(config: &NetworkConfig) -> Result<OnsetNetwork> {
        let mut c_in = config.base_width;
        let conv_stem = Conv1d::new(
            config.in_channels,
            c_in,
            config.stem_kernel_size,
            config.stem_kernel_size / 2,
            false,
        );

        let depth = 1 + config.num_blocks();
        let mut blocks = Vec::with_capacity(config.num_blocks());
        for stage in &config.stages {
            let width = stage.width * config.base_width;
            for i in 0..stage.repeat {
                let first = i == 0;
                let position = blocks.len() + 1;
                blocks.push(ResnetBlock::new(BlockSpec {
                    c_in: if first { c_in } else { width },
                    c_out: width,
                    expand: stage.expand,
                    stride: if first { 2 } else { 1 },
                    project: first,
                    norm: config.norm,
                    blur_kernel_size: config.blur_kernel_size,
                    drop_rate: config.stochastic_depth * position as f32 / depth as f32,
                })?);
            }
            c_in = width;
        }

        let norm_head = Norm::new(config.norm, c_in);
        let head_expand = match config.head {
            HeadExpansion::None => None,
            HeadExpansion::GroupedConv { factor } => Some(WeightNormConv1d::new(
                Conv1d::grouped(c_in, c_in * factor, 1, 0, c_in, true),
            )),
        };
        let features = head_expand.as_ref().map_or(c_in, |conv| conv.out_channels());

        Ok(OnsetNetwork {
            config: config.clone(),
            conv_stem,
            blocks,
            norm_head,
            head_expand,
            fc: Linear::new(features, NUM_CLASSES),
        })
    }

    /// Draws every convolution and linear weight with the configured
    /// scheme, zeroes their biases and resets the norms. Must be called
    /// after `new`.
    pub fn init<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let scheme = self.config.init;
        self.conv_stem.initialize(scheme, rng);
        for block in self.blocks.iter_mut() {
            block.initialize(scheme, rng);
        }
        self.norm_head.reset_parameters();
        if let Some(conv) = self.head_expand.as_mut() {
            conv.initialize(scheme, rng);
        }
        self.fc.initialize(scheme, rng);
    }

    /// `[batch, in_channels, time]` -> `[batch, 2]` logits.
    pub fn forward(&mut self, input: &Tensor, phase: &mut Phase) -> Matrix {
        assert_eq!(
            input.channels, self.config.in_channels,
            "network expects {} input channels", self.config.in_channels
        );

        let x = self.standardize(input, phase);
        let mut x = self.conv_stem.forward(&x);

        for block in self.blocks.iter_mut() {
            x = block.forward(&x, phase);
        }

        x = self.norm_head.forward(&x, phase.is_training());
        x.map_inplace(ops::relu);
        if let Some(conv) = &self.head_expand {
            x = conv.forward(&x);
        }

        let mut features = ops::global_max_pool(&x);
        if let Phase::Train(rng) = phase {
            regularize::dropout(&mut features, self.config.dropout, &mut **rng);
        }

        self.fc.forward(&features)
    }

    /// Standardizes each example by its own mean and (unbiased) standard
    /// deviation over channels and time, preserving relations between
    /// channels. Training perturbs the statistics with the configured jitter.
    fn standardize(&self, input: &Tensor, phase: &mut Phase) -> Tensor {
        let (mu_factor, sd_factor) = match phase {
            Phase::Train(rng) => jitter_factors(self.config.jitter, rng),
            Phase::Eval => (1.0, 1.0),
        };

        let mut out = input.clone();
        let n = (input.channels * input.len) as f32;
        for b in 0..input.batch {
            let example = out.example_mut(b);
            let mean = example.iter().sum::<f32>() / n;
            let var = example.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / (n - 1.0);

            let mean = mean * mu_factor;
            let sd = var.sqrt() * sd_factor;
            example.iter_mut().for_each(|x| *x = (*x - mean) / sd);
        }
        out
    }

    /// Trainable parameters in forward order. The frozen blur kernels
    /// and the batch-norm running statistics are not included.
    pub fn parameters(&self) -> Vec<ParamInfo> {
        let mut out = Vec::new();
        self.conv_stem.collect_params("conv_stem", &mut out);
        for (i, block) in self.blocks.iter().enumerate() {
            block.collect_params(&format!("blocks.{i}"), &mut out);
        }
        self.norm_head.collect_params("norm_head", &mut out);
        if let Some(conv) = &self.head_expand {
            conv.collect_params("head_expand", &mut out);
        }
        self.fc.collect_params("fc", &mut out);
        out
    }

    /// Optimizer groups under the configured weight-decay policy.
    /// Values of the convolution and fully connected parameters, named as
    /// in `parameters`. Feeds the per-epoch weight histograms.
    pub fn conv_and_fc_values(&self) -> Vec<(String, Vec<f32>)> {
        let mut out = Vec::new();
        self.conv_stem.collect_values("conv_stem", &mut out);
        for (i, block) in self.blocks.iter().enumerate() {
            block.collect_conv_values(&format!("blocks.{i}"), &mut out);
        }
        if let Some(conv) = &self.head_expand {
            conv.collect_values("head_expand", &mut out);
        }
        self.fc.collect_values("fc", &mut out);
        out
    }

    pub fn parameter_groups(&self, weight_decay: f64) -> Vec<ParameterGroup> {
        group_parameters(self.parameters(), self.config.weight_decay, weight_decay)
    }

    /// Serializes the configuration, weights and running statistics to a
    /// pretty-printed JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a network previously written by `save_json`.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<OnsetNetwork> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Multiplicative noise for (mean, std), one draw per statistic.
fn jitter_factors(jitter: Jitter, rng: &mut ChaCha8Rng) -> (f32, f32) {
    match jitter {
        Jitter::Off => (1.0, 1.0),
        Jitter::InvertOrScale => {
            let mut draw = || {
                let scale_up = rng.gen::<f64>() > 0.5;
                let factor = rng.gen::<f32>() + 1.0;
                if scale_up { factor } else { 1.0 / factor }
            };
            let mu = draw();
            let sd = draw();
            (mu, sd)
        }
        Jitter::Scale { low, high } => {
            let mu = rng.gen_range(low..high);
            let sd = rng.gen_range(low..high);
            (mu, sd)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::params::ParamKind;
    use rand::SeedableRng;

    fn batch(b: usize, t: usize) -> Tensor {
        let n = b * 10 * t;
        Tensor::from_data(b, 10, t, (0..n).map(|i| ((i * 7 % 13) as f32).cos() * 3.0 + 1.0).collect())
    }

    #[test]
    fn stochastic_depth_grows_with_depth() {
        let net = OnsetNetwork::new(&NetworkConfig::variant_a()).unwrap();
        let rates: Vec<f32> = net.blocks.iter().map(|b| b.drop_rate).collect();

        assert_eq!(rates.len(), 16);
        assert!((rates[0] - 0.2 / 17.0).abs() < 1e-7);
        assert!((rates[15] - 0.2 * 16.0 / 17.0).abs() < 1e-6);
        assert!(rates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn first_block_of_each_stage_downsamples() {
        let net = OnsetNetwork::new(&NetworkConfig::variant_a()).unwrap();
        let strided: Vec<usize> = net.blocks.iter()
            .enumerate()
            .filter(|(_, b)| b.stride == 2)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(strided, vec![0, 3, 7, 13]);
        assert!(net.blocks.iter().all(|b| (b.stride == 2) == b.project));
    }

    #[test]
    fn standardize_without_jitter_gives_zero_mean_unit_std() {
        let net = OnsetNetwork::new(&NetworkConfig::variant_a()).unwrap();
        let out = net.standardize(&batch(2, 8), &mut Phase::Eval);

        for b in 0..2 {
            let ex = out.example(b);
            let n = ex.len() as f32;
            let mean = ex.iter().sum::<f32>() / n;
            let var = ex.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / (n - 1.0);
            assert!(mean.abs() < 1e-5);
            assert!((var - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn jitter_stays_in_band() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let (mut up, mut down) = (0, 0);
        for _ in 0..200 {
            let (mu, sd) = jitter_factors(Jitter::InvertOrScale, &mut rng);
            for f in [mu, sd] {
                // `1 + u` can round up to exactly 2.0 in f32, so both ends are closed.
                assert!((0.5..=2.0).contains(&f), "factor {}", f);
                if f > 1.0 { up += 1 } else if f < 1.0 { down += 1 }
            }
            let (mu, sd) = jitter_factors(Jitter::Scale { low: 0.8, high: 1.2 }, &mut rng);
            assert!((0.8..1.2).contains(&mu) && (0.8..1.2).contains(&sd));
        }
        assert!(up > 100 && down > 100, "up {} down {}", up, down);
    }

    #[test]
    fn histogram_values_match_parameter_names() {
        for config in [NetworkConfig::variant_a(), NetworkConfig::variant_b()] {
            let net = OnsetNetwork::new(&config).unwrap();
            let params = net.parameters();
            let values = net.conv_and_fc_values();

            assert_eq!(values.first().map(|(n, _)| n.as_str()), Some("conv_stem.weight"));
            assert_eq!(values.last().map(|(n, _)| n.as_str()), Some("fc.bias"));
            for (name, v) in &values {
                let info = params.iter().find(|p| &p.name == name).unwrap();
                assert_eq!(info.numel, v.len(), "{}", name);
                assert!(!name.contains("norm"), "{}", name);
            }
            assert_eq!(values.iter().any(|(n, _)| n.starts_with("head_expand")), net.head_expand.is_some());
        }
    }

    #[test]
    fn variant_b_head_expands_channels() {
        let net = OnsetNetwork::new(&NetworkConfig::variant_b()).unwrap();
        assert_eq!(net.head_expand.as_ref().map(|c| c.out_channels()), Some(256));
        assert_eq!(net.fc.weights.rows, 256);

        let groups = net.parameter_groups(1e-3);
        assert_eq!(groups.len(), 2);
        assert!(groups[1].params.iter().all(|p| p.kind != ParamKind::Weight));
        assert!(groups[1].params.iter().any(|p| p.name == "head_expand.weight_g"));
    }

    #[test]
    fn variant_a_decays_everything() {
        let net = OnsetNetwork::new(&NetworkConfig::variant_a()).unwrap();
        let groups = net.parameter_groups(1e-3);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].params.first().map(|p| p.name.as_str()), Some("conv_stem.weight"));
        assert_eq!(groups[0].params.last().map(|p| p.name.as_str()), Some("fc.bias"));
    }
}
