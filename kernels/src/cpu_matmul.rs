use crate::{KernelElem, KernelError, Result};
use rayon::prelude::*;

/// Batched matrix multiplication over row-major slices.
///
/// Both operands must share their leading (batch) dimensions; the last two
/// dimensions multiply as `[.., M, K] x [.., K, N] -> [.., M, N]`. The
/// caller guarantees the batch dims match — only the contraction dimension
/// is checked here, because it is the one a flat slice cannot encode.
///
/// The right-hand side is transposed up front so every dot product streams
/// through both operands sequentially, then rayon splits the output into
/// rows: one task per `(batch, row)` pair.
pub fn cpu_matmul<T, const RANK: usize>(
    lhs: &[T],
    rhs: &[T],
    lhs_shape: &[usize; RANK],
    rhs_shape: &[usize; RANK],
) -> Result<Vec<T>>
where
    T: KernelElem,
{
    let m = lhs_shape[RANK - 2];
    let k = lhs_shape[RANK - 1];
    let n = rhs_shape[RANK - 1];

    if rhs_shape[RANK - 2] != k {
        return Err(KernelError::ShapeMismatch {
            expected: vec![k],
            got: vec![rhs_shape[RANK - 2]],
        });
    }
    let lhs_size: usize = lhs_shape.iter().product();
    if lhs.len() != lhs_size {
        return Err(KernelError::ShapeMismatch {
            expected: vec![lhs_size],
            got: vec![lhs.len()],
        });
    }

    // [.., K, N] -> [.., N, K]: columns of rhs become contiguous rows.
    let rhs_t = super::cpu_transpose::cpu_transpose(rhs, rhs_shape)?;

    let batch: usize = lhs_shape[..RANK - 2].iter().product();
    let mut out = vec![T::zero(); batch * m * n];

    out.par_chunks_mut(n)
        .enumerate()
        .for_each(|(global_row, out_row)| {
            let batch_idx = global_row / m;
            let row = global_row % m;

            let lhs_row_start = batch_idx * m * k + row * k;
            let lhs_row = &lhs[lhs_row_start..lhs_row_start + k];
            let rhs_t_batch = batch_idx * n * k;

            for (col, out_elem) in out_row.iter_mut().enumerate() {
                let rhs_t_row_start = rhs_t_batch + col * k;
                let rhs_t_row = &rhs_t[rhs_t_row_start..rhs_t_row_start + k];

                let mut acc = T::zero();
                for (&a, &b) in lhs_row.iter().zip(rhs_t_row.iter()) {
                    acc += a * b;
                }
                *out_elem = acc;
            }
        });

    Ok(out)
}
