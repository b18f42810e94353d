#![allow(dead_code)]

use std::fs::File;
use std::path::Path;

use ndarray::{Array, Array1, Array3};
use ndarray_npy::WriteNpyExt;
use onset_resnet::data::DataPaths;
use onset_resnet::network::{NetworkConfig, StageSpec};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Per-timestep labels: odd sequences carry an onset over their last
/// `onset_len` steps.
pub fn interleaved(n: usize, len: usize, onset_len: usize, seed: u64) -> Array3<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array::from_shape_fn((n, len, 11), |(i, t, c)| {
        if c == 0 {
            f32::from(i % 2 == 1 && t >= len - onset_len)
        } else {
            let shift = if i % 2 == 1 && t >= len - onset_len { 2.0 } else { 0.0 };
            rng.gen_range(-1.0..1.0) + shift * c as f32 / 10.0
        }
    })
}

/// Writes a complete set of splits under `dir` and returns their paths.
pub fn write_splits(dir: &Path, n: usize, len: usize) -> DataPaths {
    let paths = DataPaths::in_dir(dir);

    interleaved(n, len, len / 4, 1)
        .write_npy(File::create(&paths.train).unwrap())
        .unwrap();
    interleaved(n, len, len / 4, 2)
        .write_npy(File::create(&paths.valid).unwrap())
        .unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let test_inputs = Array::from_shape_fn((n, 10, len), |_| rng.gen_range(-1.0f64..1.0));
    test_inputs.write_npy(File::create(&paths.test_inputs).unwrap()).unwrap();
    let test_labels = Array1::from_shape_fn(n, |i| (i % 2) as i64);
    test_labels.write_npy(File::create(&paths.test_labels).unwrap()).unwrap();

    paths
}

/// Variant A with one block per stage, small enough for quick runs.
pub fn tiny_variant_a() -> NetworkConfig {
    NetworkConfig {
        base_width: 4,
        stages: vec![StageSpec::new(2, 1), StageSpec::new(1, 2)],
        ..NetworkConfig::variant_a()
    }
}

pub fn tiny_variant_b() -> NetworkConfig {
    NetworkConfig {
        base_width: 4,
        stages: vec![StageSpec::new(1, 1), StageSpec::new(2, 2)],
        ..NetworkConfig::variant_b()
    }
}
