//! Causal self-attention.
//!
//! Affinity scores between positions are scaled, masked so a position can
//! only look backwards, softmaxed into mixing weights, and used for a
//! weighted sum over value vectors.

use std::sync::Arc;

use num_traits::Float;
use rand::Rng;
use rayon::prelude::*;

use crate::nn::{Dropout, Linear, Module};
use crate::tensor::{Cpu, Result, Tensor, TensorElem, TensorError, TensorOps};

/// Lower-triangular mask, materialized once at `block_size` and shared by
/// every head of every block.
#[derive(Debug, Clone)]
pub struct CausalMask<T: TensorElem> {
    tril: Tensor<T, 2, Cpu>,
}

impl<T: TensorElem + Float> CausalMask<T> {
    pub fn new(block_size: usize) -> Self {
        let mut tril = Tensor::zeros([block_size, block_size]);
        let data = tril.data_mut();
        for i in 0..block_size {
            for j in 0..=i {
                data[i * block_size + j] = T::one();
            }
        }
        Self { tril }
    }

    pub fn block_size(&self) -> usize {
        self.tril.shape()[0]
    }

    /// Overwrites scores above the diagonal with `-inf`, matrix by matrix,
    /// reading the top-left `t x t` window of the mask.
    ///
    /// The diagonal itself is never masked, so every softmax row keeps at
    /// least one finite entry.
    pub fn apply(&self, scores: &mut Tensor<T, 3, Cpu>, t: usize) -> Result<()> {
        let block_size = self.block_size();
        let [_, rows, cols] = *scores.shape();
        if rows != t || cols != t {
            return Err(TensorError::ShapeMismatch {
                expected: vec![t, t],
                got: vec![rows, cols],
            });
        }
        if t > block_size {
            return Err(TensorError::ShapeMismatch {
                expected: vec![block_size, block_size],
                got: vec![t, t],
            });
        }

        let tril = self.tril.data();
        scores.data_mut().par_chunks_mut(t * t).for_each(|mat| {
            for i in 0..t {
                for j in 0..t {
                    if tril[i * block_size + j] == T::zero() {
                        mat[i * t + j] = T::neg_infinity();
                    }
                }
            }
        });
        Ok(())
    }
}

/// Row-wise softmax over the trailing dimension, max-subtracted.
fn softmax_rows<T: TensorElem + Float>(scores: &mut Tensor<T, 3, Cpu>) {
    let cols = scores.shape()[2];
    scores.data_mut().par_chunks_mut(cols).for_each(|row| {
        let mut max = row[0];
        for &v in &row[1..] {
            if v > max {
                max = v;
            }
        }

        let mut sum = T::zero();
        for v in row.iter_mut() {
            let e = (*v - max).exp();
            *v = e;
            sum += e;
        }

        let inv = T::one() / sum;
        for v in row.iter_mut() {
            *v = *v * inv;
        }
    });
}

/// One head of causal self-attention.
#[derive(Debug)]
pub struct AttentionHead<T: TensorElem> {
    pub key: Linear<T>,
    pub query: Linear<T>,
    pub value: Linear<T>,
    mask: Arc<CausalMask<T>>,
    dropout: Dropout,
    scale: T,
}

impl<T: TensorElem + Float> AttentionHead<T> {
    /// The score scale is `1 / sqrt(in_features)` of the projections: the
    /// full embedding width, not the head width.
    pub fn new(
        key: Linear<T>,
        query: Linear<T>,
        value: Linear<T>,
        mask: Arc<CausalMask<T>>,
        dropout: Dropout,
    ) -> Self {
        let n_embd = key.in_features();
        let scale = T::one() / T::from_usize(n_embd).unwrap().sqrt();
        Self {
            key,
            query,
            value,
            mask,
            dropout,
            scale,
        }
    }

    /// Bias-free projections, drawn in key, query, value order.
    pub fn init<R: Rng>(
        n_embd: usize,
        head_size: usize,
        dropout: f64,
        mask: Arc<CausalMask<T>>,
        rng: &mut R,
    ) -> Result<Self> {
        let key = Linear::init(n_embd, head_size, false, rng);
        let query = Linear::init(n_embd, head_size, false, rng);
        let value = Linear::init(n_embd, head_size, false, rng);
        Ok(Self::new(key, query, value, mask, Dropout::new(dropout)?))
    }

    pub fn head_size(&self) -> usize {
        self.key.out_features()
    }

    /// `(batch, time, n_embd) -> (batch, time, head_size)`, with dropout
    /// on the attention weights when an RNG is given.
    pub fn forward_t<R: Rng>(
        &self,
        x: &Tensor<T, 3, Cpu>,
        rng: Option<&mut R>,
    ) -> Result<Tensor<T, 3, Cpu>> {
        let [_, time, _] = *x.shape();

        let k = self.key.forward(x)?;
        let q = self.query.forward(x)?;

        let scale = self.scale;
        let mut scores = q.matmul(&k.transpose()?)?.map(move |v| v * scale);
        self.mask.apply(&mut scores, time)?;
        softmax_rows(&mut scores);
        let weights = self.dropout.forward(&scores, rng);

        let v = self.value.forward(x)?;
        weights.matmul(&v)
    }

    pub fn forward(&self, x: &Tensor<T, 3, Cpu>) -> Result<Tensor<T, 3, Cpu>> {
        self.forward_t(x, None::<&mut rand::rngs::StdRng>)
    }
}

impl<T: TensorElem + Float> Module<T> for AttentionHead<T> {
    fn forward(&self, x: &Tensor<T, 3, Cpu>) -> Result<Tensor<T, 3, Cpu>> {
        AttentionHead::forward(self, x)
    }
}

/// All heads of one block, run over the same input, concatenated back to
/// the full width and projected.
#[derive(Debug)]
pub struct MultiHeadAttention<T: TensorElem> {
    pub heads: Vec<AttentionHead<T>>,
    pub proj: Linear<T>,
    dropout: Dropout,
}

impl<T: TensorElem + Float> MultiHeadAttention<T> {
    pub fn new(heads: Vec<AttentionHead<T>>, proj: Linear<T>, dropout: Dropout) -> Self {
        Self {
            heads,
            proj,
            dropout,
        }
    }

    pub fn init<R: Rng>(
        n_embd: usize,
        n_head: usize,
        dropout: f64,
        mask: Arc<CausalMask<T>>,
        rng: &mut R,
    ) -> Result<Self> {
        let head_size = n_embd / n_head;
        let mut heads = Vec::with_capacity(n_head);
        for _ in 0..n_head {
            heads.push(AttentionHead::init(
                n_embd,
                head_size,
                dropout,
                Arc::clone(&mask),
                rng,
            )?);
        }
        let proj = Linear::init(n_embd, n_embd, true, rng);
        Ok(Self::new(heads, proj, Dropout::new(dropout)?))
    }

    /// Heads draw from the RNG in index order; the output projection's
    /// dropout draws last.
    pub fn forward_t<R: Rng>(
        &self,
        x: &Tensor<T, 3, Cpu>,
        mut rng: Option<&mut R>,
    ) -> Result<Tensor<T, 3, Cpu>> {
        let mut outs = Vec::with_capacity(self.heads.len());
        for head in &self.heads {
            outs.push(head.forward_t(x, rng.as_deref_mut())?);
        }

        let refs: Vec<&Tensor<T, 3, Cpu>> = outs.iter().collect();
        let fused = Tensor::cat_last(&refs)?;
        let projected = self.proj.forward(&fused)?;
        Ok(self.dropout.forward(&projected, rng))
    }

    pub fn forward(&self, x: &Tensor<T, 3, Cpu>) -> Result<Tensor<T, 3, Cpu>> {
        self.forward_t(x, None::<&mut rand::rngs::StdRng>)
    }
}

impl<T: TensorElem + Float> Module<T> for MultiHeadAttention<T> {
    fn forward(&self, x: &Tensor<T, 3, Cpu>) -> Result<Tensor<T, 3, Cpu>> {
        MultiHeadAttention::forward(self, x)
    }
}
