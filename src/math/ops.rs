use crate::math::{matrix::Matrix, tensor::Tensor};

pub fn relu(x: f32) -> f32 {
    if x > 0.0 { x } else { 0.0 }
}

/// 1-D cross-correlation over `[batch, channels, time]`.
///
/// `weight` is `[out, in / groups, kernel]`; zero padding is applied
/// symmetrically. Output length is `(len + 2 * padding - kernel) / stride + 1`.
pub fn conv1d(
    input: &Tensor,
    weight: &Tensor,
    bias: Option<&[f32]>,
    stride: usize,
    padding: usize,
    groups: usize,
) -> Tensor {
    let (batch, c_in, len) = input.shape();
    let (c_out, in_per_group, kernel) = weight.shape();
    assert!(groups > 0 && c_in % groups == 0 && c_out % groups == 0,
        "conv1d: {} -> {} channels not divisible into {} groups", c_in, c_out, groups);
    assert_eq!(in_per_group, c_in / groups, "conv1d: kernel expects {} input channels per group", in_per_group);
    assert!(len + 2 * padding >= kernel, "conv1d: input of length {} too short for kernel {}", len, kernel);

    let out_len = (len + 2 * padding - kernel) / stride + 1;
    let out_per_group = c_out / groups;
    let mut out = Tensor::zeros(batch, c_out, out_len);

    for b in 0..batch {
        for o in 0..c_out {
            let g = o / out_per_group;
            let base = bias.map_or(0.0, |bias| bias[o]);
            let mut acc = vec![base; out_len];

            for i in 0..in_per_group {
                let x = input.row(b, g * in_per_group + i);
                let w = weight.row(o, i);
                for (t, value) in acc.iter_mut().enumerate() {
                    let start = t * stride;
                    for (k, wk) in w.iter().enumerate() {
                        // Position in the unpadded input.
                        let pos = start + k;
                        if pos < padding || pos - padding >= len {
                            continue;
                        }
                        *value += wk * x[pos - padding];
                    }
                }
            }

            out.row_mut(b, o).copy_from_slice(&acc);
        }
    }

    out
}

/// Max over the time axis: `[batch, channels, len]` -> `[batch, channels]`.
pub fn global_max_pool(input: &Tensor) -> Matrix {
    let mut out = Matrix::zeros(input.batch, input.channels);
    for b in 0..input.batch {
        for c in 0..input.channels {
            out.data[b][c] = input.row(b, c)
                .iter()
                .copied()
                .fold(f32::NEG_INFINITY, f32::max);
        }
    }
    out
}

/// Row-wise softmax, shifted by the row max for stability.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&z| (z - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Row-wise log-softmax.
pub fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let log_sum = logits.iter().map(|&z| (z - max).exp()).sum::<f32>().ln() + max;
    logits.iter().map(|&z| z - log_sum).collect()
}
