use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::math::{init, InitScheme, Initializable, Matrix};
use crate::network::params::{ParamInfo, ParamKind};

/// Fully connected layer: `y = x W + b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Linear {
    pub size: usize,
    /// `[input_size, size]`
    pub weights: Matrix,
    /// `[1, size]`
    pub biases: Matrix,
}

impl Linear {
    pub fn new(input_size: usize, size: usize) -> Linear {
        Linear {
            size,
            weights: Matrix::zeros(input_size, size),
            biases: Matrix::zeros(1, size),
        }
    }

    /// `input` is `[batch, input_size]`, result is `[batch, size]`.
    pub fn forward(&self, input: &Matrix) -> Matrix {
        (input * &self.weights).add_row(&self.biases)
    }

    pub fn collect_params(&self, prefix: &str, out: &mut Vec<ParamInfo>) {
        out.push(ParamInfo::new(
            format!("{prefix}.weight"),
            self.weights.rows * self.weights.cols,
            ParamKind::Weight,
        ));
        out.push(ParamInfo::new(format!("{prefix}.bias"), self.size, ParamKind::Bias));
    }

    pub fn collect_values(&self, prefix: &str, out: &mut Vec<(String, Vec<f32>)>) {
        out.push((format!("{prefix}.weight"), self.weights.data.concat()));
        out.push((format!("{prefix}.bias"), self.biases.data.concat()));
    }
}

impl Initializable for Linear {
    fn initialize<R: Rng + ?Sized>(&mut self, scheme: InitScheme, rng: &mut R) {
        let fan_in = self.weights.rows;
        let mut flat = vec![0.0; fan_in * self.size];
        init::fill(&mut flat, fan_in, self.size, scheme, rng);
        self.weights = Matrix::from_data(flat.chunks(self.size).map(|row| row.to_vec()).collect());
        self.biases = Matrix::zeros(1, self.size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_projects_each_row() {
        let mut layer = Linear::new(2, 2);
        layer.weights = Matrix::from_data(vec![vec![1.0, 0.0], vec![0.0, 2.0]]);
        layer.biases = Matrix::from_data(vec![vec![0.0, 1.0]]);

        let out = layer.forward(&Matrix::from_data(vec![vec![3.0, 4.0], vec![1.0, 1.0]]));
        assert_eq!(out.data, vec![vec![3.0, 9.0], vec![1.0, 3.0]]);
    }
}
