use serde::{Serialize, Deserialize};

use crate::math::Tensor;
use crate::network::params::{ParamInfo, ParamKind};

/// Which normalization the blocks and the head use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormKind {
    Batch { momentum: f32, eps: f32 },
    Group { groups: usize, eps: f32 },
}

impl NormKind {
    pub fn batch() -> NormKind {
        NormKind::Batch { momentum: 0.01, eps: 0.001 }
    }

    pub fn group(groups: usize) -> NormKind {
        NormKind::Group { groups, eps: 1e-5 }
    }
}

/// Per-channel affine transform shared by both normalizations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Affine {
    pub gamma: Vec<f32>,
    pub beta: Vec<f32>,
}

impl Affine {
    fn new(channels: usize) -> Affine {
        Affine { gamma: vec![1.0; channels], beta: vec![0.0; channels] }
    }

    fn reset(&mut self) {
        self.gamma.fill(1.0);
        self.beta.fill(0.0);
    }
}

/// Batch normalization over `(batch, time)` with running statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNorm1d {
    pub affine: Affine,
    pub running_mean: Vec<f32>,
    pub running_var: Vec<f32>,
    pub momentum: f32,
    pub eps: f32,
}

impl BatchNorm1d {
    pub fn new(channels: usize, momentum: f32, eps: f32) -> BatchNorm1d {
        BatchNorm1d {
            affine: Affine::new(channels),
            running_mean: vec![0.0; channels],
            running_var: vec![1.0; channels],
            momentum,
            eps,
        }
    }

    /// Training uses batch statistics and updates the running estimates
    /// (unbiased variance); evaluation uses the running estimates.
    pub fn forward(&mut self, input: &Tensor, training: bool) -> Tensor {
        let (batch, channels, len) = input.shape();
        let mut out = input.clone();
        let n = (batch * len) as f32;

        for c in 0..channels {
            let (mean, var) = if training {
                let mean = (0..batch).map(|b| input.row(b, c).iter().sum::<f32>()).sum::<f32>() / n;
                let var = (0..batch)
                    .map(|b| input.row(b, c).iter().map(|x| (x - mean).powi(2)).sum::<f32>())
                    .sum::<f32>() / n;

                let unbiased = if n > 1.0 { var * n / (n - 1.0) } else { var };
                self.running_mean[c] = (1.0 - self.momentum) * self.running_mean[c] + self.momentum * mean;
                self.running_var[c] = (1.0 - self.momentum) * self.running_var[c] + self.momentum * unbiased;
                (mean, var)
            } else {
                (self.running_mean[c], self.running_var[c])
            };

            let scale = self.affine.gamma[c] / (var + self.eps).sqrt();
            let shift = self.affine.beta[c] - mean * scale;
            for b in 0..batch {
                out.row_mut(b, c).iter_mut().for_each(|x| *x = *x * scale + shift);
            }
        }

        out
    }
}

/// Group normalization: statistics per example over each channel group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupNorm {
    pub affine: Affine,
    pub groups: usize,
    pub eps: f32,
}

impl GroupNorm {
    pub fn new(channels: usize, groups: usize, eps: f32) -> GroupNorm {
        assert!(groups > 0 && channels % groups == 0,
            "GroupNorm: {} channels not divisible into {} groups", channels, groups);
        GroupNorm { affine: Affine::new(channels), groups, eps }
    }

    pub fn forward(&self, input: &Tensor) -> Tensor {
        let (batch, channels, len) = input.shape();
        let per_group = channels / self.groups;
        let n = (per_group * len) as f32;
        let mut out = input.clone();

        for b in 0..batch {
            for g in 0..self.groups {
                let members = g * per_group..(g + 1) * per_group;
                let mean = members.clone().map(|c| input.row(b, c).iter().sum::<f32>()).sum::<f32>() / n;
                let var = members.clone()
                    .map(|c| input.row(b, c).iter().map(|x| (x - mean).powi(2)).sum::<f32>())
                    .sum::<f32>() / n;
                let inv_std = 1.0 / (var + self.eps).sqrt();

                for c in members {
                    let (gamma, beta) = (self.affine.gamma[c], self.affine.beta[c]);
                    out.row_mut(b, c)
                        .iter_mut()
                        .for_each(|x| *x = (*x - mean) * inv_std * gamma + beta);
                }
            }
        }

        out
    }
}

/// A normalization stage selected by `NormKind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Norm {
    Batch(BatchNorm1d),
    Group(GroupNorm),
}

impl Norm {
    pub fn new(kind: NormKind, channels: usize) -> Norm {
        match kind {
            NormKind::Batch { momentum, eps } => Norm::Batch(BatchNorm1d::new(channels, momentum, eps)),
            NormKind::Group { groups, eps } => Norm::Group(GroupNorm::new(channels, groups, eps)),
        }
    }

    pub fn forward(&mut self, input: &Tensor, training: bool) -> Tensor {
        match self {
            Norm::Batch(bn) => bn.forward(input, training),
            Norm::Group(gn) => gn.forward(input),
        }
    }

    /// Back to gamma 1, beta 0; batch norm also forgets its running statistics.
    pub fn reset_parameters(&mut self) {
        match self {
            Norm::Batch(bn) => {
                bn.affine.reset();
                bn.running_mean.fill(0.0);
                bn.running_var.fill(1.0);
            }
            Norm::Group(gn) => gn.affine.reset(),
        }
    }

    pub fn collect_params(&self, prefix: &str, out: &mut Vec<ParamInfo>) {
        let affine = match self {
            Norm::Batch(bn) => &bn.affine,
            Norm::Group(gn) => &gn.affine,
        };
        out.push(ParamInfo::new(format!("{prefix}.weight"), affine.gamma.len(), ParamKind::NormAffine));
        out.push(ParamInfo::new(format!("{prefix}.bias"), affine.beta.len(), ParamKind::NormAffine));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn batch_norm_training_standardizes_and_tracks_running_stats() {
        let input = Tensor::from_data(2, 1, 2, vec![1.0, 3.0, 5.0, 7.0]);
        let mut bn = BatchNorm1d::new(1, 0.01, 0.001);

        let out = bn.forward(&input, true);
        let mean = out.data.iter().sum::<f32>() / 4.0;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-5);
        // batch mean 4, unbiased variance 20/3
        assert_abs_diff_eq!(bn.running_mean[0], 0.04, epsilon = 1e-6);
        assert_abs_diff_eq!(bn.running_var[0], 0.99 + 0.01 * 20.0 / 3.0, epsilon = 1e-5);
    }

    #[test]
    fn batch_norm_eval_uses_running_stats() {
        let input = Tensor::from_data(1, 1, 2, vec![2.0, 4.0]);
        let mut bn = BatchNorm1d::new(1, 0.01, 0.0);
        bn.running_mean[0] = 1.0;
        bn.running_var[0] = 4.0;

        let out = bn.forward(&input, false);
        assert_eq!(out.data, vec![0.5, 1.5]);
        assert_eq!(bn.running_mean[0], 1.0);
    }

    #[test]
    fn reset_restores_identity_affine() {
        let mut norm = Norm::new(NormKind::batch(), 2);
        norm.forward(&Tensor::from_data(2, 2, 1, vec![1.0, 2.0, 3.0, 5.0]), true);
        if let Norm::Batch(bn) = &mut norm {
            bn.affine.gamma[1] = 3.0;
        }

        norm.reset_parameters();
        match &norm {
            Norm::Batch(bn) => {
                assert_eq!(bn.affine.gamma, vec![1.0, 1.0]);
                assert_eq!(bn.running_mean, vec![0.0, 0.0]);
                assert_eq!(bn.running_var, vec![1.0, 1.0]);
            }
            Norm::Group(_) => panic!("expected batch norm"),
        }
    }

    #[test]
    fn group_norm_normalizes_each_group_per_example() {
        let input = Tensor::from_data(1, 4, 1, vec![1.0, 3.0, 10.0, 30.0]);
        let gn = GroupNorm::new(4, 2, 0.0);
        let out = gn.forward(&input);
        assert_abs_diff_eq!(out.data[0], -1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(out.data[1], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(out.data[2], -1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(out.data[3], 1.0, epsilon = 1e-5);
    }
}
