use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

/// Fan-based weight initialization applied by `OnsetNetwork::init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitScheme {
    /// He initialization: N(0, sqrt(2 / fan_in)). Pairs with ReLU.
    KaimingNormal,
    /// Glorot initialization: U(-b, b) with b = sqrt(6 / (fan_in + fan_out)).
    XavierUniform,
}

/// A layer whose weights are (re)drawn by `OnsetNetwork::init`.
///
/// Implemented by every convolution and linear layer; biases are zeroed.
pub trait Initializable {
    fn initialize<R: Rng + ?Sized>(&mut self, scheme: InitScheme, rng: &mut R);
}

/// Samples a single value from N(0, 1) using the Box-Muller transform.
fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // Both draws lie in (0, 1] so the log never sees zero.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Fills `weights` according to `scheme` for a layer with the given fans.
pub fn fill<R: Rng + ?Sized>(
    weights: &mut [f32],
    fan_in: usize,
    fan_out: usize,
    scheme: InitScheme,
    rng: &mut R,
) {
    match scheme {
        InitScheme::KaimingNormal => {
            let std_dev = (2.0 / fan_in as f64).sqrt();
            for w in weights.iter_mut() {
                *w = (sample_standard_normal(rng) * std_dev) as f32;
            }
        }
        InitScheme::XavierUniform => {
            let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
            for w in weights.iter_mut() {
                *w = rng.gen_range(-bound..bound) as f32;
            }
        }
    }
}
