use serde::{Serialize, Deserialize};

/// Hyperparameters handed to the external optimizer: SGD with momentum
/// and weight decay, wrapped in Lookahead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sgd {
    pub learning_rate: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    pub lookahead: Lookahead,
}

/// Slow-weight synchronization every `k` steps with interpolation `alpha`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lookahead {
    pub k: usize,
    pub alpha: f64,
}

impl Default for Lookahead {
    fn default() -> Self {
        Lookahead { k: 5, alpha: 0.5 }
    }
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate, ..Sgd::default() }
    }
}

impl Default for Sgd {
    fn default() -> Self {
        Sgd {
            learning_rate: 0.01,
            momentum: 0.9,
            weight_decay: 0.001,
            lookahead: Lookahead::default(),
        }
    }
}
