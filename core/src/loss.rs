//! Cross-entropy over flattened logits.

use num_traits::Float;
use rayon::prelude::*;

use crate::tensor::{Cpu, Result, Tensor, TensorElem, TensorError};

/// Mean negative log-likelihood of `targets` under a row-wise softmax of
/// `logits`.
///
/// Rows are `(batch * time, vocab_size)`; every target must index inside
/// the vocabulary. Each row's log-probability is computed as a
/// max-subtracted log-sum-exp:
/// `loss_i = max_i + ln(sum_j exp(l_ij - max_i)) - l_i,target_i`.
pub fn cross_entropy<T: TensorElem + Float>(
    logits: &Tensor<T, 2, Cpu>,
    targets: &Tensor<usize, 1, Cpu>,
) -> Result<T> {
    let [rows, vocab] = *logits.shape();
    if targets.shape()[0] != rows {
        return Err(TensorError::ShapeMismatch {
            expected: vec![rows],
            got: vec![targets.shape()[0]],
        });
    }
    for &target in targets.data() {
        if target >= vocab {
            return Err(TensorError::IndexOutOfBounds {
                index: vec![target],
                shape: vec![rows, vocab],
            });
        }
    }

    let total = logits
        .data()
        .par_chunks(vocab)
        .zip(targets.data().par_iter())
        .map(|(row, &target)| {
            let mut max = row[0];
            for &v in &row[1..] {
                if v > max {
                    max = v;
                }
            }

            let mut sum = T::zero();
            for &v in row {
                sum += (v - max).exp();
            }

            max + sum.ln() - row[target]
        })
        .reduce(T::zero, |a, b| a + b);

    Ok(total / T::from_usize(rows).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_logits_cost_log_vocab() {
        let logits = Tensor::<f64, 2>::zeros([2, 2]);
        let targets = Tensor::new(vec![0usize, 1], [2]).unwrap();
        let loss = cross_entropy(&logits, &targets).unwrap();
        assert!((loss - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn matches_hand_computed_values() {
        // Row [1, 2, 3]: lse = 3 + ln(e^-2 + e^-1 + 1).
        let logits = Tensor::new(vec![1.0f64, 2.0, 3.0], [1, 3]).unwrap();

        let hits = Tensor::new(vec![2usize], [1]).unwrap();
        let loss = cross_entropy(&logits, &hits).unwrap();
        assert!((loss - 0.4076059644443806).abs() < 1e-12);

        let misses = Tensor::new(vec![0usize], [1]).unwrap();
        let loss = cross_entropy(&logits, &misses).unwrap();
        assert!((loss - 2.4076059644443806).abs() < 1e-12);
    }

    #[test]
    fn averages_over_rows() {
        let logits = Tensor::new(vec![0.0f64, 0.0, 1.0, 0.0], [2, 2]).unwrap();
        let targets = Tensor::new(vec![0usize, 0], [2]).unwrap();
        let loss = cross_entropy(&logits, &targets).unwrap();
        assert!((loss - 0.5032044340390841).abs() < 1e-12);
    }

    #[test]
    fn is_stable_for_large_logits() {
        let logits = Tensor::new(vec![1000.0f64, 1000.0], [1, 2]).unwrap();
        let targets = Tensor::new(vec![0usize], [1]).unwrap();
        let loss = cross_entropy(&logits, &targets).unwrap();
        assert!(loss.is_finite());
        assert!((loss - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn rejects_targets_outside_the_vocabulary() {
        let logits = Tensor::<f32, 2>::zeros([2, 3]);
        let targets = Tensor::new(vec![0usize, 3], [2]).unwrap();
        assert!(matches!(
            cross_entropy(&logits, &targets),
            Err(TensorError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn rejects_row_count_mismatch() {
        let logits = Tensor::<f32, 2>::zeros([2, 3]);
        let targets = Tensor::new(vec![0usize], [1]).unwrap();
        assert!(matches!(
            cross_entropy(&logits, &targets),
            Err(TensorError::ShapeMismatch { .. })
        ));
    }
}
