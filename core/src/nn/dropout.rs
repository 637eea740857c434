//! Inverted dropout.

use num_traits::Float;
use rand::Rng;

use crate::tensor::{Cpu, Result, Tensor, TensorElem, TensorError};

/// Randomly zeroes elements with the configured probability and rescales
/// the survivors by `1 / (1 - rate)`.
///
/// The RNG is the train/eval switch: `Some` draws one uniform per element
/// in row-major order; `None` is the identity. A rate of zero draws
/// nothing.
#[derive(Debug, Clone, Copy)]
pub struct Dropout {
    rate: f64,
}

impl Dropout {
    /// Rates live in `[0, 1)`; dropping everything leaves nothing to
    /// rescale.
    pub fn new(rate: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&rate) {
            return Err(TensorError::InvalidConfig(format!(
                "dropout rate must be in [0, 1), got {rate}"
            )));
        }
        Ok(Self { rate })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn forward<T, const RANK: usize, R>(
        &self,
        x: &Tensor<T, RANK, Cpu>,
        rng: Option<&mut R>,
    ) -> Tensor<T, RANK, Cpu>
    where
        T: TensorElem + Float,
        R: Rng,
    {
        let Some(rng) = rng else {
            return x.clone();
        };
        if self.rate == 0.0 {
            return x.clone();
        }

        let scale = T::from_f64(1.0 / (1.0 - self.rate)).unwrap();
        let mut out = x.clone();
        for v in out.data_mut() {
            if rng.random::<f64>() < self.rate {
                *v = T::zero();
            } else {
                *v = *v * scale;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn rejects_rates_outside_the_half_open_interval() {
        assert!(Dropout::new(1.0).is_err());
        assert!(Dropout::new(-0.1).is_err());
        assert!(Dropout::new(0.0).is_ok());
        assert!(Dropout::new(0.999).is_ok());
    }

    #[test]
    fn without_an_rng_it_is_the_identity() {
        let dropout = Dropout::new(0.5).unwrap();
        let x = Tensor::<f64, 2>::ones([4, 4]);
        let y = dropout.forward(&x, None::<&mut StdRng>);
        assert_eq!(y.data(), x.data());
    }

    #[test]
    fn zero_rate_passes_through_and_draws_nothing() {
        let dropout = Dropout::new(0.0).unwrap();
        let x = Tensor::<f64, 1>::ones([8]);

        let mut rng = StdRng::seed_from_u64(5);
        let y = dropout.forward(&x, Some(&mut rng));
        assert_eq!(y.data(), x.data());

        // The stream is untouched.
        let mut fresh = StdRng::seed_from_u64(5);
        assert_eq!(rng.random::<u64>(), fresh.random::<u64>());
    }

    #[test]
    fn survivors_are_rescaled_and_the_rest_zeroed() {
        let dropout = Dropout::new(0.5).unwrap();
        let x = Tensor::<f64, 2>::ones([32, 32]);
        let mut rng = StdRng::seed_from_u64(42);
        let y = dropout.forward(&x, Some(&mut rng));

        let mut zeroed = 0usize;
        for &v in y.data() {
            if v == 0.0 {
                zeroed += 1;
            } else {
                assert!((v - 2.0).abs() < 1e-12);
            }
        }
        // Roughly half survive at rate 0.5.
        assert!(zeroed > 256 && zeroed < 768);
    }

    #[test]
    fn seeded_masks_are_reproducible() {
        let dropout = Dropout::new(0.3).unwrap();
        let x = Tensor::<f32, 1>::ones([64]);

        let a = dropout.forward(&x, Some(&mut StdRng::seed_from_u64(9)));
        let b = dropout.forward(&x, Some(&mut StdRng::seed_from_u64(9)));
        assert_eq!(a.data(), b.data());
    }
}
