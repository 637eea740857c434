//! Slice-level CPU kernels for `nanogpt-rs`.
//!
//! The tensor crate owns shapes and strides; this crate is the numeric
//! substrate underneath it. Each kernel takes flat row-major slices plus the
//! shapes they were cut from, validates the geometry, and fans the work out
//! across rayon. Keeping the kernels free of the tensor type means the
//! dependency only points one way and a vectorized replacement (a
//! BLAS-backed build, say) would swap this crate without touching the rest.

use num_traits::{FromPrimitive, Num, NumAssign, ToPrimitive};
use std::fmt::Debug;
use thiserror::Error;

pub mod cpu_matmul;
pub mod cpu_transpose;

pub use cpu_matmul::cpu_matmul;
pub use cpu_transpose::cpu_transpose;

/// Element types the kernels operate on.
///
/// Mirrors the tensor crate's element trait instead of importing it, so that
/// crate can depend on this one and not the other way around. The blanket
/// impl keeps the two in lockstep automatically.
pub trait KernelElem:
    Num + NumAssign + Copy + Clone + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

impl<T> KernelElem for T where
    T: Num
        + NumAssign
        + Copy
        + Clone
        + Debug
        + Send
        + Sync
        + FromPrimitive
        + ToPrimitive
        + PartialOrd
{
}

/// Errors surfaced by the kernels. The tensor layer maps these into its own
/// error type at the call site.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("Kernel shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
}

pub type Result<T> = std::result::Result<T, KernelError>;
