//! Turning one position's logits into a drawn token.

use num_traits::Float;
use rand::Rng;

use crate::tensor::TensorElem;

/// Max-subtracted softmax over a logits slice.
///
/// A distribution that underflows to all zeros comes back uniform.
pub fn softmax<T: TensorElem + Float>(logits: &[T]) -> Vec<T> {
    let mut max = T::neg_infinity();
    for &v in logits {
        if v > max {
            max = v;
        }
    }

    let mut probs: Vec<T> = logits.iter().map(|&v| (v - max).exp()).collect();
    let mut sum = T::zero();
    for &p in &probs {
        sum += p;
    }

    if sum > T::zero() {
        for p in &mut probs {
            *p = *p / sum;
        }
    } else if !probs.is_empty() {
        let uniform = T::one() / T::from_usize(probs.len()).unwrap();
        for p in &mut probs {
            *p = uniform;
        }
    }
    probs
}

/// Draws an index from a probability slice by inverse CDF: one uniform in
/// `[0, 1)`, walked against the running sum.
///
/// Accumulated rounding can leave the tail short of one; the last index
/// absorbs that remainder. `probs` must be non-empty.
pub fn categorical<T: TensorElem + Float, R: Rng>(probs: &[T], rng: &mut R) -> usize {
    debug_assert!(!probs.is_empty());

    let draw = rng.random::<f64>();
    let mut cumulative = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumulative += p.to_f64().unwrap();
        if draw < cumulative {
            return i;
        }
    }
    probs.len().saturating_sub(1)
}
