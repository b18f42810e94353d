pub mod config;
pub mod network;
pub mod params;

pub use config::{HeadExpansion, Jitter, NetworkConfig, StageSpec, INPUT_CHANNELS, NUM_CLASSES};
pub use network::{OnsetNetwork, Phase};
pub use params::{ParamInfo, ParamKind, ParameterGroup, WeightDecay};
