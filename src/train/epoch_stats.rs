use serde::{Serialize, Deserialize};

use crate::metrics::ConfusionMatrix;

/// Which split a pass ran over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Valid,
    Test,
}

impl Split {
    /// Prefix used for reported scalar names (`val_loss`, `test_auc`, ...).
    pub fn prefix(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Valid => "val",
            Split::Test => "test",
        }
    }
}

/// Summary of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
    pub split: Split,
    /// 1-based epoch number; `0` for a standalone evaluation.
    pub epoch: usize,
    /// Mean of the per-batch weighted losses.
    pub loss: f64,
    /// `None` when the pass held a single class.
    pub auc: Option<f64>,
    pub confusion: Option<ConfusionMatrix>,
    pub examples: usize,
}
