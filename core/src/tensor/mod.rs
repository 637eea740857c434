//! Dense row-major tensors with a const-generic rank.
//!
//! The rank lives in the type (`Tensor<f32, 3>` is a batch of sequences of
//! feature vectors); the individual dimensions stay runtime values so the
//! same model handles any batch size or context length without
//! re-instantiation. Shape errors therefore surface at runtime, as
//! [`TensorError`] values rather than panics.
//!
//! ```rust
//! use nanogpt_rs::tensor::Tensor;
//!
//! let t = Tensor::<f32, 2>::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap();
//! assert_eq!(t.shape(), &[2, 3]);
//! assert_eq!(t.strides(), &[3, 1]);
//! ```
//!
//! Buffers are flat and contiguous ([`Storage`]); where they live is the
//! device's business ([`Device`]). Element-wise math, matmul, transpose and
//! concatenation are in [`ops`].

use num_traits::{FromPrimitive, Num, NumAssign, ToPrimitive};
use std::fmt::Debug;
use thiserror::Error;

pub mod device;
pub mod ops;
pub mod storage;

pub use device::{Cpu, Device};
pub use ops::TensorOps;
pub use storage::Storage;

/// Error type shared by tensor ops, layers, and models.
#[derive(Error, Debug)]
pub enum TensorError {
    /// Two shapes that had to agree did not.
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// An index (token id, class id, position) fell outside a table.
    #[error("Index out of bounds: index {index:?} for shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },
    /// A hyperparameter combination the architecture cannot represent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// An operation this device or rank does not provide.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, TensorError>;

/// Element types a tensor can hold.
///
/// Blanket-implemented for anything numeric, copyable, and thread-safe;
/// `f32`, `f64` and `usize` (token ids) are the types the model uses. The
/// `Send + Sync` bounds are what let ops fan out across rayon.
pub trait TensorElem:
    Num + NumAssign + Copy + Clone + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

impl<T> TensorElem for T where
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

/// An N-dimensional array over a [`Device`].
///
/// Fields are private: every constructor and op validates shapes on the way
/// in, so an existing tensor is always internally consistent — the buffer
/// length matches the shape product and the strides are the row-major
/// strides of the shape.
#[derive(Clone)]
pub struct Tensor<T, const RANK: usize, D: Device = Cpu>
where
    T: TensorElem,
{
    shape: [usize; RANK],
    strides: [usize; RANK],
    data: D::Storage<T>,
    device: D,
}

/// Row-major strides: the last dimension is contiguous.
const fn compute_strides<const RANK: usize>(shape: &[usize; RANK]) -> [usize; RANK] {
    let mut strides = [0; RANK];
    let mut stride = 1;
    let mut i = RANK;
    while i > 0 {
        i -= 1;
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

impl<T, const RANK: usize> Tensor<T, RANK, Cpu>
where
    T: TensorElem,
{
    /// Builds a tensor from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when `data.len()` differs from the shape product.
    pub fn new(data: Vec<T>, shape: [usize; RANK]) -> Result<Self> {
        let size: usize = shape.iter().product();
        if data.len() != size {
            return Err(TensorError::ShapeMismatch {
                expected: vec![size],
                got: vec![data.len()],
            });
        }
        Ok(Self {
            shape,
            strides: compute_strides(&shape),
            data,
            device: Cpu,
        })
    }

    /// A tensor of zeros.
    pub fn zeros(shape: [usize; RANK]) -> Self {
        let size: usize = shape.iter().product();
        Self {
            shape,
            strides: compute_strides(&shape),
            data: vec![T::zero(); size],
            device: Cpu,
        }
    }

    /// A tensor of ones.
    pub fn ones(shape: [usize; RANK]) -> Self {
        let size: usize = shape.iter().product();
        Self {
            shape,
            strides: compute_strides(&shape),
            data: vec![T::one(); size],
            device: Cpu,
        }
    }

    /// Reinterprets the buffer under a new shape, possibly of a different
    /// rank. Consumes the tensor; the buffer is reused, not copied.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when the element counts differ.
    pub fn reshape<const NEW_RANK: usize>(
        self,
        new_shape: [usize; NEW_RANK],
    ) -> Result<Tensor<T, NEW_RANK, Cpu>> {
        let new_size: usize = new_shape.iter().product();
        if new_size != self.size() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.size()],
                got: vec![new_size],
            });
        }
        Ok(Tensor {
            shape: new_shape,
            strides: compute_strides(&new_shape),
            data: self.data,
            device: self.device,
        })
    }
}

impl<T, const RANK: usize, D: Device> Tensor<T, RANK, D>
where
    T: TensorElem,
{
    pub const fn shape(&self) -> &[usize; RANK] {
        &self.shape
    }

    pub const fn strides(&self) -> &[usize; RANK] {
        &self.strides
    }

    /// Total element count (the product of the shape).
    pub const fn size(&self) -> usize {
        let mut size = 1;
        let mut i = 0;
        while i < RANK {
            size *= self.shape[i];
            i += 1;
        }
        size
    }

    /// The flat row-major buffer.
    pub fn data(&self) -> &[T] {
        self.data.as_slice()
    }

    /// Mutable access to the flat buffer. The shape is fixed; only values
    /// can change.
    pub fn data_mut(&mut self) -> &mut [T] {
        self.data.as_mut_slice()
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<T, const RANK: usize, D: Device> Debug for Tensor<T, RANK, D>
where
    T: TensorElem,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("device", &self.device.name())
            .field("data_len", &self.data.len())
            .finish()
    }
}
