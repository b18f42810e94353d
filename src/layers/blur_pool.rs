use serde::{Serialize, Deserialize};

use crate::error::{OnsetError, Result};
use crate::math::{ops, Tensor};

/// Fixed binomial low-pass filter followed by stride-2 decimation.
///
/// The kernel is frozen: it is not a trainable parameter and `init`
/// leaves it untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlurPool1d {
    pub channels: usize,
    pub kernel_size: usize,
    /// `[channels, 1, kernel_size]`, the same row for every channel.
    kernel: Tensor,
}

impl BlurPool1d {
    pub fn new(channels: usize, kernel_size: usize) -> Result<BlurPool1d> {
        let binomial: &[f32] = match kernel_size {
            3 => &[1.0, 2.0, 1.0],
            5 => &[1.0, 4.0, 6.0, 4.0, 1.0],
            7 => &[1.0, 6.0, 15.0, 20.0, 15.0, 6.0, 1.0],
            other => return Err(OnsetError::UnsupportedKernelSize(other)),
        };
        let total: f32 = binomial.iter().sum();
        let row: Vec<f32> = binomial.iter().map(|c| c / total).collect();

        let data = row.iter().copied().cycle().take(channels * kernel_size).collect();
        Ok(BlurPool1d {
            channels,
            kernel_size,
            kernel: Tensor::from_data(channels, 1, kernel_size, data),
        })
    }

    /// Normalized filter coefficients shared by every channel.
    pub fn coefficients(&self) -> &[f32] {
        self.kernel.row(0, 0)
    }

    /// `[batch, channels, len]` -> `[batch, channels, ceil(len / 2)]`.
    pub fn forward(&self, input: &Tensor) -> Tensor {
        ops::conv1d(input, &self.kernel, None, 2, self.kernel_size / 2, self.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn coefficients_sum_to_one() {
        for k in [3, 5, 7] {
            let pool = BlurPool1d::new(4, k).unwrap();
            assert_eq!(pool.coefficients().len(), k);
            assert_abs_diff_eq!(pool.coefficients().iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        }
        let pool = BlurPool1d::new(1, 3).unwrap();
        assert_eq!(pool.coefficients(), &[0.25, 0.5, 0.25]);
    }

    #[test]
    fn other_kernel_sizes_are_rejected() {
        for k in [0, 1, 2, 4, 6, 9] {
            assert!(matches!(
                BlurPool1d::new(4, k),
                Err(OnsetError::UnsupportedKernelSize(size)) if size == k
            ));
        }
    }

    #[test]
    fn halves_length_and_preserves_constants_inside() {
        let pool = BlurPool1d::new(2, 5).unwrap();
        let input = Tensor::from_data(1, 2, 9, vec![1.0; 18]);
        let out = pool.forward(&input);

        assert_eq!(out.shape(), (1, 2, 5));
        // Interior outputs see the full kernel, so a constant passes through.
        assert_abs_diff_eq!(out.row(0, 1)[2], 1.0, epsilon = 1e-6);
        assert!(out.row(0, 0)[0] < 1.0);
    }
}
