use tracing::{debug, info};

use crate::metrics::ConfusionMatrix;

/// Receives run telemetry: scalars per step, parameter histograms and
/// confusion matrices per validation pass.
pub trait Reporter {
    fn scalar(&mut self, name: &str, value: f64, step: usize);

    /// Distribution of one named parameter tensor.
    fn histogram(&mut self, name: &str, values: &[f32], step: usize);

    fn confusion_matrix(&mut self, title: &str, matrix: &ConfusionMatrix);
}

/// Writes everything through `tracing`. Per-batch training scalars go to
/// `debug`, epoch-level scalars to `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn scalar(&mut self, name: &str, value: f64, step: usize) {
        if name.starts_with("train_") || name == "lr" || name == "momentum" {
            debug!(step, "{name} = {value:.6}");
        } else {
            info!(step, "{name} = {value:.6}");
        }
    }

    fn histogram(&mut self, name: &str, values: &[f32], step: usize) {
        let Some(summary) = Summary::of(values) else {
            return;
        };
        debug!(
            step,
            min = summary.min,
            max = summary.max,
            mean = summary.mean,
            std = summary.std,
            "{name} histogram"
        );
    }

    fn confusion_matrix(&mut self, title: &str, matrix: &ConfusionMatrix) {
        info!("{title}\n{matrix}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Summary {
    min: f32,
    max: f32,
    mean: f32,
    std: f32,
}

impl Summary {
    fn of(values: &[f32]) -> Option<Summary> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f32;
        let min = values.iter().copied().fold(f32::INFINITY, f32::min);
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mean = values.iter().sum::<f32>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        Some(Summary { min, max, mean, std: var.sqrt() })
    }
}
