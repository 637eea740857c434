use crate::{KernelElem, Result};
use rayon::prelude::*;

/// Transpose of the last two dimensions, `[.., M, N] -> [.., N, M]`.
///
/// Parallelized over rows of the output: row `j` of an output matrix is
/// column `j` of the corresponding input matrix, so each task gathers one
/// strided column into a contiguous row.
pub fn cpu_transpose<T, const RANK: usize>(data: &[T], shape: &[usize; RANK]) -> Result<Vec<T>>
where
    T: KernelElem,
{
    let size: usize = shape.iter().product();
    if data.len() != size {
        return Err(crate::KernelError::ShapeMismatch {
            expected: vec![size],
            got: vec![data.len()],
        });
    }

    let m = shape[RANK - 2];
    let n = shape[RANK - 1];

    let mut out = vec![T::zero(); size];

    // Output viewed as `batch * n` rows of length `m`.
    out.par_chunks_mut(m)
        .enumerate()
        .for_each(|(global_row, out_row)| {
            let batch_idx = global_row / n;
            let col = global_row % n;
            let input_batch = batch_idx * m * n;

            for (row, out_elem) in out_row.iter_mut().enumerate() {
                *out_elem = data[input_batch + row * n + col];
            }
        });

    Ok(out)
}
