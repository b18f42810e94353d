use ndarray::{Array1, Array2, Array3, ArrayD, Axis, Ix1, Ix2};

use crate::data::features::Features;
use crate::error::{OnsetError, Result};

/// Minority fraction below which a positive sequence is discounted.
const PURITY_THRESHOLD: f64 = 0.1;
/// Applied to every positive per-timestep example after the discount.
const DISCOUNT_COMPENSATION: f64 = 1.1;

/// Ground truth at either granularity.
#[derive(Debug, Clone, PartialEq)]
pub enum Labels {
    /// `[N, T]`, one binary label per timestep (training and validation).
    PerTimestep(Array2<i64>),
    /// `[N]`, one binary label per sequence (held-out test set).
    PerSequence(Array1<i64>),
}

/// One sampled item: channel-first sequence, class index, loss weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    /// `[channels, time]`
    pub sequence: Array2<f32>,
    pub label: usize,
    pub weight: [f32; 1],
}

/// Indexed access to sequences with class-balanced, confidence-discounted
/// example weights.
#[derive(Debug, Clone)]
pub struct OnsetDataset {
    features: Features,
    /// `(N, T, C)`
    dim: (usize, usize, usize),
    labels: Labels,
    class_weights: [f64; 2],
}

impl OnsetDataset {
    /// `sequences` is `[N, T, C]`; `labels` must be `[N, T]` or `[N]`.
    pub fn new(sequences: Array3<f32>, labels: ArrayD<i64>) -> Result<OnsetDataset> {
        OnsetDataset::with_features(Features::Owned(sequences), labels)
    }

    /// Like `new`, over any backing store, including a mapped file.
    pub fn with_features(features: Features, labels: ArrayD<i64>) -> Result<OnsetDataset> {
        let dim = features.dim();
        let (n, len, _) = dim;
        let shape_error = |shape: &[usize]| OnsetError::InvalidLabelShape {
            shape: shape.to_vec(),
            sequences: n,
            len,
        };

        let labels = match labels.ndim() {
            1 => Labels::PerSequence(
                labels.into_dimensionality::<Ix1>().map_err(|_| shape_error(&[]))?,
            ),
            2 => Labels::PerTimestep(
                labels.into_dimensionality::<Ix2>().map_err(|_| shape_error(&[]))?,
            ),
            _ => return Err(shape_error(labels.shape())),
        };

        match &labels {
            Labels::PerSequence(y) if y.len() != n => return Err(shape_error(y.shape())),
            Labels::PerTimestep(y) if y.dim() != (n, len) => return Err(shape_error(y.shape())),
            _ => {}
        }

        let reduced = reduce_labels(&labels)?;
        let class_weights = balanced_class_weights(&reduced)?;

        Ok(OnsetDataset { features, dim, labels, class_weights })
    }

    pub fn len(&self) -> usize {
        self.dim.0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sequence_len(&self) -> usize {
        self.dim.1
    }

    pub fn channels(&self) -> usize {
        self.dim.2
    }

    /// Whether examples are read from a mapped file rather than memory.
    pub fn is_mapped(&self) -> bool {
        self.features.is_mapped()
    }

    /// Weight for class 0 and class 1.
    pub fn class_weights(&self) -> [f64; 2] {
        self.class_weights
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Returns the example at `item`; the weight is computed on every call.
    ///
    /// # Panics
    /// Panics if `item >= len()`.
    pub fn get(&self, item: usize) -> Example {
        let (label, weight) = match &self.labels {
            Labels::PerTimestep(y) => {
                let row = y.row(item);
                let positives = row.iter().filter(|&&v| v == 1).count();
                let label = usize::from(positives > 0);
                let mut weight = self.class_weights[label];

                if label == 1 {
                    let pct_pos = positives as f64 / row.len() as f64;
                    let pct = pct_pos.min(1.0 - pct_pos);
                    if pct < PURITY_THRESHOLD {
                        weight *= 10.0 * pct;
                    }
                    weight *= DISCOUNT_COMPENSATION;
                }
                (label, weight)
            }
            Labels::PerSequence(y) => {
                let label = y[item] as usize;
                (label, self.class_weights[label])
            }
        };

        let sequence = self.features
            .view()
            .index_axis_move(Axis(0), item)
            .reversed_axes()
            .as_standard_layout()
            .into_owned();

        Example { sequence, label, weight: [weight as f32] }
    }
}

/// Sequence-level labels: the per-row max for per-timestep labels.
fn reduce_labels(labels: &Labels) -> Result<Vec<usize>> {
    let values: Box<dyn Iterator<Item = i64> + '_> = match labels {
        Labels::PerSequence(y) => Box::new(y.iter().copied()),
        Labels::PerTimestep(y) => {
            if let Some(&bad) = y.iter().find(|&&v| v != 0 && v != 1) {
                return Err(OnsetError::InvalidLabel(bad));
            }
            Box::new(y.rows().into_iter().map(|row| row.iter().copied().max().unwrap_or(0)))
        }
    };

    values
        .map(|v| match v {
            0 | 1 => Ok(v as usize),
            other => Err(OnsetError::InvalidLabel(other)),
        })
        .collect()
}

/// "Balanced" weights: `n / (2 * count(c))` for each class.
pub fn balanced_class_weights(labels: &[usize]) -> Result<[f64; 2]> {
    let total = labels.len();
    let mut counts = [0usize; 2];
    for &label in labels {
        counts[label] += 1;
    }

    let mut weights = [0.0; 2];
    for (class, &count) in counts.iter().enumerate() {
        if count == 0 {
            return Err(OnsetError::DegenerateClassBalance { class, total });
        }
        weights[class] = total as f64 / (2.0 * count as f64);
    }
    Ok(weights)
}
