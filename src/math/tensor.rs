use serde::{Serialize, Deserialize};
use std::ops::Add;

/// Dense 3-D tensor stored row-major as `[batch, channels, len]`.
///
/// Activations use the layout `[batch, channels, time]`; convolution
/// kernels reuse it as `[out_channels, in_channels_per_group, kernel]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub batch: usize,
    pub channels: usize,
    pub len: usize,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn zeros(batch: usize, channels: usize, len: usize) -> Tensor {
        Tensor {
            batch,
            channels,
            len,
            data: vec![0.0; batch * channels * len],
        }
    }

    pub fn from_data(batch: usize, channels: usize, len: usize, data: Vec<f32>) -> Tensor {
        if data.len() != batch * channels * len {
            panic!(
                "Tensor data has {} elements, expected {}x{}x{}",
                data.len(), batch, channels, len
            )
        }
        Tensor { batch, channels, len, data }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.batch, self.channels, self.len)
    }

    /// The `len`-long row at `(b, c)`.
    pub fn row(&self, b: usize, c: usize) -> &[f32] {
        let start = (b * self.channels + c) * self.len;
        &self.data[start..start + self.len]
    }

    pub fn row_mut(&mut self, b: usize, c: usize) -> &mut [f32] {
        let start = (b * self.channels + c) * self.len;
        &mut self.data[start..start + self.len]
    }

    /// All channels of example `b`, contiguous.
    pub fn example(&self, b: usize) -> &[f32] {
        let size = self.channels * self.len;
        &self.data[b * size..(b + 1) * size]
    }

    pub fn example_mut(&mut self, b: usize) -> &mut [f32] {
        let size = self.channels * self.len;
        &mut self.data[b * size..(b + 1) * size]
    }

    pub fn map_inplace<F>(&mut self, functor: F)
    where
        F: Fn(f32) -> f32,
    {
        for x in self.data.iter_mut() {
            *x = functor(*x);
        }
    }

    /// Euclidean norm of each `[channels, len]` slab, one per leading index.
    pub fn slab_norms(&self) -> Vec<f32> {
        (0..self.batch)
            .map(|b| self.example(b).iter().map(|x| x * x).sum::<f32>().sqrt())
            .collect()
    }
}

impl Add for Tensor {
    type Output = Tensor;

    fn add(mut self, rhs: Self) -> Self::Output {
        if self.shape() != rhs.shape() {
            panic!(
                "Tensors are of incorrect sizes: {:?} vs {:?}",
                self.shape(), rhs.shape()
            )
        }

        for (x, y) in self.data.iter_mut().zip(rhs.data.iter()) {
            *x += y;
        }

        self
    }
}
