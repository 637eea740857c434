//! Layer normalization.

use num_traits::Float;
use rayon::prelude::*;

use super::Module;
use crate::tensor::{Cpu, Result, Tensor, TensorElem, TensorError};

/// Normalizes the trailing feature dimension to zero mean and unit
/// variance, then applies a learned scale and shift:
/// `y = (x - mean) / sqrt(var + eps) * weight + bias`.
#[derive(Debug, Clone)]
pub struct LayerNorm<T: TensorElem> {
    pub weight: Tensor<T, 1, Cpu>,
    pub bias: Tensor<T, 1, Cpu>,
    eps: T,
}

impl<T: TensorElem + Float> LayerNorm<T> {
    pub fn new(weight: Tensor<T, 1, Cpu>, bias: Tensor<T, 1, Cpu>, eps: T) -> Self {
        Self { weight, bias, eps }
    }

    /// Unit scale, zero shift.
    pub fn init(features: usize, eps: f64) -> Self {
        Self {
            weight: Tensor::ones([features]),
            bias: Tensor::zeros([features]),
            eps: T::from_f64(eps).unwrap(),
        }
    }

    /// Normalizes every row of the trailing dimension independently.
    pub fn forward<const RANK: usize>(
        &self,
        x: &Tensor<T, RANK, Cpu>,
    ) -> Result<Tensor<T, RANK, Cpu>> {
        const { assert!(RANK >= 1, "layer norm requires rank >= 1") };

        let features = x.shape()[RANK - 1];
        if features != self.weight.shape()[0] || features != self.bias.shape()[0] {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.weight.shape()[0]],
                got: vec![features],
            });
        }

        let weight = self.weight.data();
        let bias = self.bias.data();
        let eps = self.eps;
        let n = T::from_usize(features).unwrap();

        let mut out = x.clone();
        out.data_mut().par_chunks_mut(features).for_each(|row| {
            let mut mean = T::zero();
            for &v in row.iter() {
                mean += v;
            }
            mean = mean / n;

            let mut var = T::zero();
            for &v in row.iter() {
                let d = v - mean;
                var += d * d;
            }
            var = var / n;

            let rstd = T::one() / (var + eps).sqrt();
            for (i, v) in row.iter_mut().enumerate() {
                *v = (*v - mean) * rstd * weight[i] + bias[i];
            }
        });

        Ok(out)
    }
}

impl<T: TensorElem + Float> Module<T> for LayerNorm<T> {
    fn forward(&self, x: &Tensor<T, 3, Cpu>) -> Result<Tensor<T, 3, Cpu>> {
        LayerNorm::forward(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    #[test]
    fn normalizes_to_zero_mean_unit_variance() {
        // [1, 2, 3]: mean 2, var 2/3, normalized to +-1.2247 around 0.
        let norm = LayerNorm::<f64>::init(3, 1e-5);
        let x = Tensor::new(vec![1.0, 2.0, 3.0], [1, 1, 3]).unwrap();

        let y = LayerNorm::forward(&norm, &x).unwrap();
        let expected = [-1.2247356859083902, 0.0, 1.2247356859083902];
        for (got, want) in y.data().iter().zip(expected) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn rows_are_normalized_independently() {
        let norm = LayerNorm::<f64>::init(2, 1e-5);
        let x = Tensor::new(vec![1.0, 3.0, 100.0, 300.0], [1, 2, 2]).unwrap();

        let y = LayerNorm::forward(&norm, &x).unwrap();
        // Both rows normalize to the same shape despite the scale gap.
        assert!((y.data()[0] - y.data()[2]).abs() < 1e-6);
        assert!((y.data()[1] - y.data()[3]).abs() < 1e-6);
    }

    #[test]
    fn scale_and_shift_apply_after_normalization() {
        let weight = Tensor::new(vec![2.0f64, 2.0], [2]).unwrap();
        let bias = Tensor::new(vec![1.0f64, 1.0], [2]).unwrap();
        let norm = LayerNorm::new(weight, bias, 1e-12);
        let x = Tensor::new(vec![-1.0, 1.0], [1, 2]).unwrap();

        let y = LayerNorm::forward(&norm, &x).unwrap();
        assert!((y.data()[0] - (-1.0)).abs() < 1e-6);
        assert!((y.data()[1] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_feature_width_mismatch() {
        let norm = LayerNorm::<f32>::init(4, 1e-5);
        let x = Tensor::<f32, 2>::zeros([2, 3]);
        assert!(matches!(
            LayerNorm::forward(&norm, &x),
            Err(TensorError::ShapeMismatch { .. })
        ));
    }
}
