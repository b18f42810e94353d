use serde::{Serialize, Deserialize};

/// Step decay: the learning rate is multiplied by `gamma` every
/// `step_size` epochs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepLr {
    pub initial_lr: f64,
    pub step_size: usize,
    pub gamma: f64,
}

impl StepLr {
    pub fn new(initial_lr: f64, step_size: usize, gamma: f64) -> StepLr {
        assert!(step_size > 0, "step_size must be at least 1");
        StepLr { initial_lr, step_size, gamma }
    }

    /// Learning rate in effect during 0-based `epoch`.
    pub fn lr_at(&self, epoch: usize) -> f64 {
        self.initial_lr * self.gamma.powi((epoch / self.step_size) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn halves_every_fifteen_epochs() {
        let schedule = StepLr::new(0.01, 15, 0.5);
        assert_abs_diff_eq!(schedule.lr_at(0), 0.01);
        assert_abs_diff_eq!(schedule.lr_at(14), 0.01);
        assert_abs_diff_eq!(schedule.lr_at(15), 0.005);
        assert_abs_diff_eq!(schedule.lr_at(74), 0.01 / 16.0);
    }
}
