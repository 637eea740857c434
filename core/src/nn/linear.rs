//! Fully connected projection.

use num_traits::Float;
use rand::Rng;
use rayon::prelude::*;

use super::{init, Module};
use crate::tensor::{Cpu, Result, Tensor, TensorElem, TensorError, TensorOps};

/// Affine map over the trailing feature dimension.
///
/// The weight is stored `(out_features, in_features)`, so a forward pass
/// multiplies by its transpose.
#[derive(Debug, Clone)]
pub struct Linear<T: TensorElem> {
    pub weight: Tensor<T, 2, Cpu>,
    pub bias: Option<Tensor<T, 1, Cpu>>,
}

impl<T: TensorElem> Linear<T> {
    pub fn new(weight: Tensor<T, 2, Cpu>, bias: Option<Tensor<T, 1, Cpu>>) -> Self {
        Self { weight, bias }
    }

    /// Draws parameters from `U(-1/sqrt(in_features), 1/sqrt(in_features))`,
    /// weight first, then bias.
    pub fn init<R: Rng>(
        in_features: usize,
        out_features: usize,
        bias: bool,
        rng: &mut R,
    ) -> Self
    where
        T: Float,
    {
        let bound = 1.0 / (in_features as f64).sqrt();
        let weight = init::uniform([out_features, in_features], bound, rng);
        let bias = bias.then(|| init::uniform([out_features], bound, rng));
        Self { weight, bias }
    }

    pub fn in_features(&self) -> usize {
        self.weight.shape()[1]
    }

    pub fn out_features(&self) -> usize {
        self.weight.shape()[0]
    }

    /// `(batch, time, in_features) -> (batch, time, out_features)`.
    ///
    /// Positions are flattened into rows for one batched matmul, then the
    /// bias (if any) is broadcast over every row.
    pub fn forward(&self, x: &Tensor<T, 3, Cpu>) -> Result<Tensor<T, 3, Cpu>> {
        let [batch, time, features] = *x.shape();
        let [out_features, in_features] = *self.weight.shape();
        if features != in_features {
            return Err(TensorError::ShapeMismatch {
                expected: vec![batch, time, in_features],
                got: vec![batch, time, features],
            });
        }
        if let Some(bias) = &self.bias {
            if bias.shape()[0] != out_features {
                return Err(TensorError::ShapeMismatch {
                    expected: vec![out_features],
                    got: vec![bias.shape()[0]],
                });
            }
        }

        let flat = x.clone().reshape([batch * time, features])?;
        let mut out = flat.matmul(&self.weight.transpose()?)?;

        if let Some(bias) = &self.bias {
            let bias = bias.data();
            out.data_mut().par_chunks_mut(out_features).for_each(|row| {
                for (v, b) in row.iter_mut().zip(bias) {
                    *v += *b;
                }
            });
        }

        out.reshape([batch, time, out_features])
    }
}

impl<T: TensorElem> Module<T> for Linear<T> {
    fn forward(&self, x: &Tensor<T, 3, Cpu>) -> Result<Tensor<T, 3, Cpu>> {
        Linear::forward(self, x)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn projects_with_the_transpose_of_the_weight() {
        // Rows of the weight select single input features.
        let weight = tensor!([1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0], [2, 3]);
        let layer = Linear::new(weight, None);

        let x = Tensor::new(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], [1, 2, 3]).unwrap();
        let y = layer.forward(&x).unwrap();

        assert_eq!(y.shape(), &[1, 2, 2]);
        assert_eq!(y.data(), &[1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn bias_broadcasts_over_every_position() {
        let weight = tensor!([1.0f64, 0.0, 0.0, 1.0], [2, 2]);
        let bias = tensor!([10.0f64, -10.0], [2]);
        let layer = Linear::new(weight, Some(bias));

        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], [1, 2, 2]).unwrap();
        let y = layer.forward(&x).unwrap();

        assert_eq!(y.data(), &[11.0, -8.0, 13.0, -6.0]);
    }

    #[test]
    fn rejects_feature_width_mismatch() {
        let layer = Linear::<f32>::new(Tensor::zeros([2, 3]), None);
        let x = Tensor::<f32, 3>::zeros([1, 2, 4]);
        assert!(matches!(
            layer.forward(&x),
            Err(TensorError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn init_bound_follows_fan_in() {
        let mut rng = StdRng::seed_from_u64(3);
        let layer = Linear::<f64>::init(64, 16, true, &mut rng);
        let bound = 1.0 / 8.0;

        assert_eq!(layer.weight.shape(), &[16, 64]);
        assert!(layer.weight.data().iter().all(|v| v.abs() < bound));
        assert!(layer.bias.unwrap().data().iter().all(|v| v.abs() < bound));
    }
}
