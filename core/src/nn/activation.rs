//! Pointwise nonlinearities.

use num_traits::Float;

use crate::tensor::{Cpu, Tensor, TensorElem};

/// GELU, tanh approximation:
/// `0.5 * x * (1 + tanh(sqrt(2/pi) * (x + 0.044715 * x^3)))`.
///
/// Evaluated in the element type itself; f64 inputs stay f64 throughout.
pub fn gelu<T: TensorElem + Float>(x: T) -> T {
    let sqrt_2_over_pi = T::from_f64((2.0 / std::f64::consts::PI).sqrt()).unwrap();
    let c = T::from_f64(0.044715).unwrap();
    let half = T::from_f64(0.5).unwrap();

    let inner = sqrt_2_over_pi * (x + c * x * x * x);
    half * x * (T::one() + inner.tanh())
}

/// Activation functions namespace.
pub struct Activation;

impl Activation {
    /// Applies [`gelu`] element-wise.
    pub fn gelu<const RANK: usize, T: TensorElem + Float>(
        x: &Tensor<T, RANK, Cpu>,
    ) -> Tensor<T, RANK, Cpu> {
        x.map(gelu)
    }
}
