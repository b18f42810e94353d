use serde::{Serialize, Deserialize};

/// What a trainable tensor is, for weight-decay grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Weight,
    Bias,
    NormAffine,
    /// Weight-norm magnitude.
    Gain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub numel: usize,
    pub kind: ParamKind,
}

impl ParamInfo {
    pub fn new(name: String, numel: usize, kind: ParamKind) -> ParamInfo {
        ParamInfo { name, numel, kind }
    }
}

/// How weight decay is spread over the parameters handed to the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightDecay {
    /// Every parameter decays.
    All,
    /// Norm affine parameters, biases and weight-norm gains do not decay.
    ExcludeNormAndBias,
}

/// Parameters that share one weight-decay coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGroup {
    pub weight_decay: f64,
    pub params: Vec<ParamInfo>,
}

impl ParameterGroup {
    pub fn numel(&self) -> usize {
        self.params.iter().map(|p| p.numel).sum()
    }
}

/// Splits `params` into optimizer groups. Empty groups are dropped.
pub fn group_parameters(params: Vec<ParamInfo>, policy: WeightDecay, weight_decay: f64) -> Vec<ParameterGroup> {
    let (decay, no_decay): (Vec<ParamInfo>, Vec<ParamInfo>) = match policy {
        WeightDecay::All => (params, Vec::new()),
        WeightDecay::ExcludeNormAndBias => params
            .into_iter()
            .partition(|p| p.kind == ParamKind::Weight),
    };

    [
        ParameterGroup { weight_decay, params: decay },
        ParameterGroup { weight_decay: 0.0, params: no_decay },
    ]
    .into_iter()
    .filter(|group| !group.params.is_empty())
    .collect()
}
