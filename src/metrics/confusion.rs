use std::fmt;

use serde::{Serialize, Deserialize};

/// 2x2 confusion matrix: `counts[true][predicted]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Thresholds positive-class probabilities at 0.5. A probability of
    /// exactly 0.5 rounds to class 0 (round half to even).
    pub fn from_probabilities(y_true: &[usize], probabilities: &[f32]) -> ConfusionMatrix {
        assert_eq!(y_true.len(), probabilities.len(), "one probability per label");
        let mut counts = [[0; 2]; 2];
        for (&truth, &p) in y_true.iter().zip(probabilities.iter()) {
            let predicted = usize::from(p > 0.5);
            counts[truth][predicted] += 1;
        }
        ConfusionMatrix { counts }
    }

    pub fn support(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    /// Rows divided by true-class support; empty rows stay zero.
    pub fn normalized(&self) -> [[f64; 2]; 2] {
        let mut out = [[0.0; 2]; 2];
        for (truth, row) in self.counts.iter().enumerate() {
            let support = self.support(truth);
            if support == 0 {
                continue;
            }
            for (predicted, &count) in row.iter().enumerate() {
                out[truth][predicted] = count as f64 / support as f64;
            }
        }
        out
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rates = self.normalized();
        writeln!(f, "          pred 0   pred 1")?;
        for (truth, row) in rates.iter().enumerate() {
            writeln!(f, "true {truth}  {:>7.2}% {:>7.2}%", row[0] * 100.0, row[1] * 100.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_normalized_by_support() {
        let cm = ConfusionMatrix::from_probabilities(&[0, 0, 0, 0, 1, 1], &[0.1, 0.2, 0.7, 0.5, 0.9, 0.3]);
        assert_eq!(cm.counts, [[3, 1], [1, 1]]);
        assert_eq!(cm.normalized(), [[0.75, 0.25], [0.5, 0.5]]);
    }

    #[test]
    fn display_shows_percentages() {
        let cm = ConfusionMatrix { counts: [[1, 1], [0, 2]] };
        let text = cm.to_string();
        assert!(text.contains("50.00%"));
        assert!(text.contains("100.00%"));
    }
}
