use crate::math::{ops, Matrix};

/// Class-weighted categorical cross-entropy on raw logits.
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Unreduced loss per row: `-log softmax(logits)[label]`.
    ///
    /// `logits` — `[batch, n_classes]`
    /// `labels` — class index per row
    pub fn per_example(logits: &Matrix, labels: &[usize]) -> Vec<f32> {
        assert_eq!(logits.rows, labels.len(), "one label per logit row");
        logits.data.iter().zip(labels.iter())
            .map(|(row, &label)| -ops::log_softmax(row)[label])
            .collect()
    }

    /// Batch loss: `mean_i(weight_i * CE_i)`.
    pub fn weighted(logits: &Matrix, labels: &[usize], weights: &[f32]) -> f32 {
        assert_eq!(labels.len(), weights.len(), "one weight per label");
        let n = labels.len() as f32;
        Self::per_example(logits, labels).iter().zip(weights.iter())
            .map(|(ce, w)| w * ce)
            .sum::<f32>() / n
    }

    /// Softmax probability of the positive (onset) class for each row.
    pub fn positive_probability(logits: &Matrix) -> Vec<f32> {
        logits.data.iter().map(|row| ops::softmax(row)[1]).collect()
    }
}
