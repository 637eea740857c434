//! The shared layer interface.

use std::fmt::Debug;

use crate::tensor::{Cpu, Result, Tensor, TensorElem};

/// A layer over batched sequence activations.
///
/// `forward` is the deterministic eval path: layers that carry dropout
/// only draw randomness through their `forward_t` variants, so two calls
/// here with the same input always produce the same output.
pub trait Module<T: TensorElem>: Debug + Send + Sync {
    /// Maps `(batch, time, features_in)` to `(batch, time, features_out)`.
    fn forward(&self, x: &Tensor<T, 3, Cpu>) -> Result<Tensor<T, 3, Cpu>>;
}
