//! Lookup tables for token ids and positions.

use num_traits::Float;
use rand::Rng;
use rayon::prelude::*;

use super::init;
use crate::tensor::{Cpu, Result, Tensor, TensorElem, TensorError};

/// A `(num_embeddings, dim)` table indexed by integer id.
#[derive(Debug, Clone)]
pub struct Embedding<T: TensorElem> {
    pub weight: Tensor<T, 2, Cpu>,
}

impl<T: TensorElem> Embedding<T> {
    pub fn new(weight: Tensor<T, 2, Cpu>) -> Self {
        Self { weight }
    }

    /// Draws the table from a unit normal, row by row.
    pub fn init<R: Rng>(num_embeddings: usize, dim: usize, rng: &mut R) -> Self
    where
        T: Float,
    {
        Self {
            weight: init::normal([num_embeddings, dim], 0.0, 1.0, rng),
        }
    }

    pub fn num_embeddings(&self) -> usize {
        self.weight.shape()[0]
    }

    pub fn dim(&self) -> usize {
        self.weight.shape()[1]
    }

    /// Gathers one table row per id: `(batch, time) -> (batch, time, dim)`.
    ///
    /// Any id at or past the table length is an error, not a clamp.
    pub fn forward(&self, ids: &Tensor<usize, 2, Cpu>) -> Result<Tensor<T, 3, Cpu>> {
        let [batch, time] = *ids.shape();
        let [num_embeddings, dim] = *self.weight.shape();

        for &id in ids.data() {
            if id >= num_embeddings {
                return Err(TensorError::IndexOutOfBounds {
                    index: vec![id],
                    shape: vec![num_embeddings, dim],
                });
            }
        }

        let table = self.weight.data();
        let mut out = Tensor::zeros([batch, time, dim]);
        out.data_mut()
            .par_chunks_mut(dim)
            .zip(ids.data().par_iter())
            .for_each(|(row, &id)| {
                row.copy_from_slice(&table[id * dim..(id + 1) * dim]);
            });

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn gathers_rows_by_id() {
        let table = tensor!([0.0f32, 0.1, 1.0, 1.1, 2.0, 2.1], [3, 2]);
        let emb = Embedding::new(table);

        let ids = Tensor::new(vec![2usize, 0, 0, 1], [2, 2]).unwrap();
        let out = emb.forward(&ids).unwrap();

        assert_eq!(out.shape(), &[2, 2, 2]);
        assert_eq!(out.data(), &[2.0, 2.1, 0.0, 0.1, 0.0, 0.1, 1.0, 1.1]);
    }

    #[test]
    fn rejects_ids_past_the_table() {
        let emb = Embedding::<f32>::new(Tensor::zeros([3, 2]));
        let ids = Tensor::new(vec![0usize, 3], [1, 2]).unwrap();
        assert!(matches!(
            emb.forward(&ids),
            Err(TensorError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn init_is_seed_reproducible() {
        let a = Embedding::<f64>::init(5, 4, &mut StdRng::seed_from_u64(11));
        let b = Embedding::<f64>::init(5, 4, &mut StdRng::seed_from_u64(11));
        assert_eq!(a.weight.data(), b.weight.data());
    }
}
