//! Tensor math: element-wise arithmetic, batched matmul, transpose, and
//! last-dimension concatenation.
//!
//! Shapes must match exactly for element-wise ops — there is no
//! broadcasting; the layers above arrange their operands instead. Everything
//! here fans out across rayon internally, but calls are synchronous: one
//! call, one finished result.
//!
//! ```rust
//! use nanogpt_rs::tensor::Tensor;
//!
//! let a = Tensor::<f32, 1>::new(vec![1.0, 2.0], [2]).unwrap();
//! let b = Tensor::<f32, 1>::new(vec![3.0, 4.0], [2]).unwrap();
//! assert_eq!((&a + &b).unwrap().data(), &[4.0, 6.0]);
//! ```

use super::{compute_strides, Cpu, Device, Result, Tensor, TensorElem, TensorError};

use rayon::prelude::*;
use std::ops::{Add, Div, Mul, Sub};

/// Generates a `std::ops` impl for `&Tensor op &Tensor` with strict shape
/// checking and a rayon-parallel element loop.
macro_rules! impl_bin_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl<'a, T, const RANK: usize> $trait for &'a Tensor<T, RANK, Cpu>
        where
            T: TensorElem,
        {
            type Output = Result<Tensor<T, RANK, Cpu>>;

            fn $method(self, rhs: Self) -> Self::Output {
                if self.shape != rhs.shape {
                    return Err(TensorError::ShapeMismatch {
                        expected: self.shape.to_vec(),
                        got: rhs.shape.to_vec(),
                    });
                }

                let mut out = self.clone();
                out.data
                    .as_mut_slice()
                    .par_iter_mut()
                    .zip(rhs.data.as_slice().par_iter())
                    .for_each(|(o, &r)| *o = *o $op r);
                Ok(out)
            }
        }
    };
}

impl_bin_op!(Add, add, +);
impl_bin_op!(Sub, sub, -);
impl_bin_op!(Mul, mul, *);
impl_bin_op!(Div, div, /);

/// Ops whose implementation lives with the device.
pub trait TensorOps: Sized {
    /// Swaps the last two dimensions, materializing the result.
    fn transpose(&self) -> Result<Self>;
}

impl<T, const RANK: usize, D: Device> TensorOps for Tensor<T, RANK, D>
where
    T: TensorElem,
{
    fn transpose(&self) -> Result<Self> {
        let data = D::transpose(&self.data, &self.shape)?;

        let mut shape = self.shape;
        if RANK >= 2 {
            shape.swap(RANK - 1, RANK - 2);
        }
        Ok(Tensor {
            shape,
            strides: compute_strides(&shape),
            data,
            device: self.device.clone(),
        })
    }
}

impl<T, const RANK: usize> Tensor<T, RANK, Cpu>
where
    T: TensorElem,
{
    /// Applies `f` to every element. The closure runs from rayon worker
    /// threads, so it must be pure.
    ///
    /// ```rust
    /// use nanogpt_rs::tensor::Tensor;
    /// let t = Tensor::<f32, 1>::new(vec![1.0, 2.0, 3.0], [3]).unwrap();
    /// assert_eq!(t.map(|x| x * x).data(), &[1.0, 4.0, 9.0]);
    /// ```
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync,
    {
        let mut out = self.clone();
        out.data
            .as_mut_slice()
            .par_iter_mut()
            .for_each(|v| *v = f(*v));
        out
    }

    /// Batched matrix multiplication over the last two dimensions:
    /// `[.., M, K] x [.., K, N] -> [.., M, N]`. Leading dimensions are batch
    /// dimensions and must agree exactly.
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        const { assert!(RANK >= 2, "matmul requires rank >= 2") };

        if self.shape[..RANK - 2] != rhs.shape[..RANK - 2] {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.to_vec(),
                got: rhs.shape.to_vec(),
            });
        }

        let data = nanogpt_rs_kernels::cpu_matmul(
            self.data.as_slice(),
            rhs.data.as_slice(),
            &self.shape,
            &rhs.shape,
        )
        .map_err(|e| match e {
            nanogpt_rs_kernels::KernelError::ShapeMismatch { expected, got } => {
                TensorError::ShapeMismatch { expected, got }
            }
        })?;

        let mut shape = self.shape;
        shape[RANK - 1] = rhs.shape[RANK - 1];
        Ok(Tensor {
            shape,
            strides: compute_strides(&shape),
            data,
            device: Cpu,
        })
    }

    /// Concatenates tensors along the last dimension. All leading
    /// dimensions must match; the trailing widths add up.
    ///
    /// This is how multi-head attention fuses per-head outputs back into
    /// the full feature width.
    pub fn cat_last(parts: &[&Self]) -> Result<Self> {
        const { assert!(RANK >= 1, "cat_last requires rank >= 1") };

        let first = parts.first().ok_or_else(|| {
            TensorError::Unsupported("cat_last needs at least one tensor".to_string())
        })?;
        let lead = &first.shape[..RANK - 1];

        let mut width = 0;
        for part in parts {
            if &part.shape[..RANK - 1] != lead {
                return Err(TensorError::ShapeMismatch {
                    expected: first.shape.to_vec(),
                    got: part.shape.to_vec(),
                });
            }
            width += part.shape[RANK - 1];
        }

        let rows: usize = lead.iter().product();
        let mut shape = first.shape;
        shape[RANK - 1] = width;

        let mut data = vec![T::zero(); rows * width];
        data.par_chunks_mut(width)
            .enumerate()
            .for_each(|(row, out_row)| {
                let mut at = 0;
                for part in parts {
                    let w = part.shape[RANK - 1];
                    out_row[at..at + w].copy_from_slice(&part.data()[row * w..(row + 1) * w]);
                    at += w;
                }
            });

        Ok(Tensor {
            shape,
            strides: compute_strides(&shape),
            data,
            device: Cpu,
        })
    }
}
