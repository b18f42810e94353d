use rand::Rng;

use crate::math::{Matrix, Tensor};

/// Stochastic depth: zeroes the whole branch of each example with
/// probability `p` and rescales survivors by `1 / (1 - p)`.
pub fn drop_connect<R: Rng + ?Sized>(input: &mut Tensor, p: f32, rng: &mut R) {
    assert!((0.0..=1.0).contains(&p), "p must be in range of [0,1]");
    let keep_prob = 1.0 - p;

    for b in 0..input.batch {
        let mask = (keep_prob + rng.gen::<f32>()).floor();
        let scale = if mask > 0.0 { 1.0 / keep_prob } else { 0.0 };
        input.example_mut(b).iter_mut().for_each(|x| *x *= scale);
    }
}

/// Element-wise dropout on head features.
pub fn dropout<R: Rng + ?Sized>(input: &mut Matrix, p: f32, rng: &mut R) {
    if p <= 0.0 {
        return;
    }
    let keep_prob = 1.0 - p;
    for x in input.data.iter_mut().flatten() {
        *x = if rng.gen::<f32>() < keep_prob { *x / keep_prob } else { 0.0 };
    }
}
