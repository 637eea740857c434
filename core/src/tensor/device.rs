//! Execution targets for tensors.
//!
//! A device decides where a tensor's buffer lives and which kernels run
//! against it. The device is a *type parameter* of the tensor, so values on
//! different devices are different types: an attention mask built for a
//! model sits on the model's device by construction, and a forward pass can
//! never mix placements by accident.

use crate::tensor::{Result, Storage, TensorElem, TensorError};
use std::fmt::Debug;

/// An execution target: a storage allocator plus the data-movement kernels
/// that run where the storage lives.
pub trait Device: Clone + Debug + PartialEq + Send + Sync {
    /// Buffer type this device allocates for elements of type `T`.
    type Storage<T>: Storage<T>
    where
        T: TensorElem;

    /// Short human-readable name, used by the tensor's `Debug` output.
    ///
    /// ```rust
    /// use nanogpt_rs::tensor::{Cpu, Device};
    /// assert_eq!(Cpu.name(), "CPU");
    /// ```
    fn name(&self) -> &'static str;

    /// Swap of the last two dimensions, run with this device's kernels.
    fn transpose<T: TensorElem, const RANK: usize>(
        data: &Self::Storage<T>,
        shape: &[usize; RANK],
    ) -> Result<Self::Storage<T>>;
}

/// The host CPU: `Vec<T>` buffers in system memory, rayon-parallel kernels
/// from the `nanogpt-rs-kernels` crate.
#[derive(Clone, Debug, PartialEq)]
pub struct Cpu;

impl Device for Cpu {
    type Storage<T>
        = Vec<T>
    where
        T: TensorElem;

    fn name(&self) -> &'static str {
        "CPU"
    }

    fn transpose<T: TensorElem, const RANK: usize>(
        data: &Self::Storage<T>,
        shape: &[usize; RANK],
    ) -> Result<Self::Storage<T>> {
        if RANK < 2 {
            return Err(TensorError::Unsupported(
                "transpose requires rank >= 2".into(),
            ));
        }
        nanogpt_rs_kernels::cpu_transpose(data, shape).map_err(|e| match e {
            nanogpt_rs_kernels::KernelError::ShapeMismatch { expected, got } => {
                TensorError::ShapeMismatch { expected, got }
            }
        })
    }
}
