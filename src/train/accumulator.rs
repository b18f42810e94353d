use tracing::debug;

use crate::error::Result;
use crate::loss::CrossEntropyLoss;
use crate::math::Matrix;
use crate::metrics::{roc_auc, ConfusionMatrix};
use crate::train::epoch_stats::{EpochReport, Split};

/// Predictions collected over one pass, owned by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalAccumulator {
    split: Split,
    probabilities: Vec<f32>,
    labels: Vec<usize>,
    batch_losses: Vec<f32>,
}

impl EvalAccumulator {
    pub fn new(split: Split) -> EvalAccumulator {
        EvalAccumulator {
            split,
            probabilities: Vec::new(),
            labels: Vec::new(),
            batch_losses: Vec::new(),
        }
    }

    /// Records one batch: its logits, true labels and weighted loss.
    pub fn push(&mut self, logits: &Matrix, labels: &[usize], loss: f32) {
        self.probabilities.extend(CrossEntropyLoss::positive_probability(logits));
        self.labels.extend_from_slice(labels);
        self.batch_losses.push(loss);
    }

    /// AUC and confusion matrix; both need the two classes present.
    pub fn metrics(&self) -> Result<(f64, ConfusionMatrix)> {
        let auc = roc_auc(&self.labels, &self.probabilities)?;
        Ok((auc, ConfusionMatrix::from_probabilities(&self.labels, &self.probabilities)))
    }

    /// Consumes the pass. A single-class pass yields a report without
    /// AUC or confusion matrix instead of an error.
    pub fn finish(self, epoch: usize) -> EpochReport {
        let loss = if self.batch_losses.is_empty() {
            0.0
        } else {
            self.batch_losses.iter().map(|&l| l as f64).sum::<f64>() / self.batch_losses.len() as f64
        };

        let (auc, confusion) = match self.metrics() {
            Ok((auc, cm)) => (Some(auc), Some(cm)),
            Err(err) => {
                debug!(split = self.split.prefix(), %err, "skipping metrics");
                (None, None)
            }
        };

        EpochReport {
            split: self.split,
            epoch,
            loss,
            auc,
            confusion,
            examples: self.labels.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn logits(ps: &[f32]) -> Matrix {
        // logit difference ln(p / (1 - p)) gives softmax probability p
        Matrix::from_data(ps.iter().map(|&p| vec![0.0, (p / (1.0 - p)).ln()]).collect())
    }

    #[test]
    fn finish_reports_mean_loss_and_metrics() {
        let mut acc = EvalAccumulator::new(Split::Valid);
        acc.push(&logits(&[0.2, 0.9]), &[0, 1], 1.0);
        acc.push(&logits(&[0.7]), &[0], 2.0);

        let report = acc.finish(3);
        assert_eq!(report.epoch, 3);
        assert_eq!(report.examples, 3);
        assert_abs_diff_eq!(report.loss, 1.5);
        assert_abs_diff_eq!(report.auc.unwrap(), 1.0);
        assert_eq!(report.confusion.unwrap().counts, [[1, 1], [0, 1]]);
    }

    #[test]
    fn single_class_pass_skips_metrics() {
        let mut acc = EvalAccumulator::new(Split::Test);
        acc.push(&logits(&[0.2, 0.9]), &[1, 1], 0.5);

        let report = acc.finish(0);
        assert_eq!(report.auc, None);
        assert_eq!(report.confusion, None);
        assert_abs_diff_eq!(report.loss, 0.5);
    }
}
