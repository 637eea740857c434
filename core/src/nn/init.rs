//! Weight initializers.
//!
//! Both draw element by element in row-major order from the caller's RNG,
//! so a seeded generator rebuilds identical parameters.

use num_traits::Float;
use rand::Rng;

use crate::tensor::{Cpu, Tensor, TensorElem};

/// Fills a tensor with draws from `U(-bound, bound)`.
pub fn uniform<T, const RANK: usize, R>(
    shape: [usize; RANK],
    bound: f64,
    rng: &mut R,
) -> Tensor<T, RANK, Cpu>
where
    T: TensorElem + Float,
    R: Rng,
{
    let span = 2.0 * bound;
    let mut out = Tensor::zeros(shape);
    for v in out.data_mut() {
        *v = T::from_f64(rng.random::<f64>() * span - bound).unwrap();
    }
    out
}

/// Fills a tensor with draws from `N(mean, std^2)` via Box-Muller.
pub fn normal<T, const RANK: usize, R>(
    shape: [usize; RANK],
    mean: f64,
    std: f64,
    rng: &mut R,
) -> Tensor<T, RANK, Cpu>
where
    T: TensorElem + Float,
    R: Rng,
{
    let mut out = Tensor::zeros(shape);
    for v in out.data_mut() {
        // Clamp away from zero; ln(0) is -inf.
        let u1 = rng.random::<f64>().max(f64::MIN_POSITIVE);
        let u2 = rng.random::<f64>();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        *v = T::from_f64(mean + std * z).unwrap();
    }
    out
}
