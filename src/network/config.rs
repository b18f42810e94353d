use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::layers::norm::NormKind;
use crate::math::InitScheme;
use crate::network::params::WeightDecay;

/// Number of feature channels per timestep.
pub const INPUT_CHANNELS: usize = 10;
/// Logits: no-onset, onset.
pub const NUM_CLASSES: usize = 2;

/// One stage of residual blocks. The first block downsamples and
/// projects; the remaining `repeat - 1` keep shape and skip-connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    pub repeat: usize,
    /// Width as a multiple of `NetworkConfig::base_width`.
    pub width: usize,
    pub expand: usize,
}

impl StageSpec {
    pub fn new(repeat: usize, width: usize) -> StageSpec {
        StageSpec { repeat, width, expand: 1 }
    }
}

/// Optional channel expansion between the head norm and the pooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HeadExpansion {
    None,
    /// Weight-normalized depthwise 1x1 conv multiplying channels by `factor`.
    GroupedConv { factor: usize },
}

/// Training-time noise on the input standardization statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Jitter {
    Off,
    /// Multiply or divide (coin flip) by `1 + u`, `u ~ U[0, 1)`.
    InvertOrScale,
    /// Multiply by a factor drawn from `[low, high)`.
    Scale { low: f32, high: f32 },
}

/// Architecture of an `OnsetNetwork`.
///
/// Both experiment variants are presets of this one struct:
/// `variant_a` (batch norm, dropout, stochastic depth, Kaiming) and
/// `variant_b` (group norm, grouped head expansion, Xavier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub in_channels: usize,
    pub base_width: usize,
    pub stem_kernel_size: usize,
    pub stages: Vec<StageSpec>,
    pub norm: NormKind,
    pub blur_kernel_size: usize,
    pub head: HeadExpansion,
    /// Head dropout rate; `0.0` disables it.
    pub dropout: f32,
    /// Base stochastic depth rate; `0.0` disables it.
    pub stochastic_depth: f32,
    pub init: InitScheme,
    pub jitter: Jitter,
    pub weight_decay: WeightDecay,
}

impl NetworkConfig {
    pub fn variant_a() -> NetworkConfig {
        NetworkConfig {
            name: "onset-resnet-a".to_string(),
            in_channels: INPUT_CHANNELS,
            base_width: 16,
            stem_kernel_size: 9,
            stages: vec![
                StageSpec::new(3, 1),
                StageSpec::new(4, 2),
                StageSpec::new(6, 4),
                StageSpec::new(3, 8),
            ],
            norm: NormKind::batch(),
            blur_kernel_size: 3,
            head: HeadExpansion::None,
            dropout: 0.5,
            stochastic_depth: 0.2,
            init: InitScheme::KaimingNormal,
            jitter: Jitter::InvertOrScale,
            weight_decay: WeightDecay::All,
        }
    }

    pub fn variant_b() -> NetworkConfig {
        NetworkConfig {
            name: "onset-resnet-b".to_string(),
            stages: vec![
                StageSpec::new(3, 1),
                StageSpec::new(4, 2),
                StageSpec::new(2, 4),
            ],
            norm: NormKind::group(4),
            head: HeadExpansion::GroupedConv { factor: 4 },
            dropout: 0.0,
            stochastic_depth: 0.0,
            init: InitScheme::XavierUniform,
            jitter: Jitter::Scale { low: 0.8, high: 1.2 },
            weight_decay: WeightDecay::ExcludeNormAndBias,
            ..NetworkConfig::variant_a()
        }
    }

    pub fn num_blocks(&self) -> usize {
        self.stages.iter().map(|s| s.repeat).sum()
    }

    /// Channel count entering the head.
    pub fn final_width(&self) -> usize {
        self.stages.last().map_or(self.base_width, |s| s.width * self.base_width)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<NetworkConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig::variant_a()
    }
}
