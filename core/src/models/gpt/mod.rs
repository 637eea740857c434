//! A small GPT-style decoder.
//!
//! Token and position embeddings are summed, passed through a stack of
//! pre-norm attention/feed-forward blocks, normalized once more, and
//! projected to vocabulary logits. Generation feeds sampled tokens back
//! in, one at a time, under a sliding `block_size` window.

use std::sync::Arc;

use num_traits::Float;
use rand::Rng;

use super::traits::CausalLM;
use crate::loss;
use crate::nn::transformer::attention::{CausalMask, MultiHeadAttention};
use crate::nn::{Activation, Dropout, Embedding, LayerNorm, Linear, Module};
use crate::sampling;
use crate::tensor::{Cpu, Result, Tensor, TensorElem, TensorError};

/// Model hyperparameters, validated once at construction.
#[derive(Debug, Clone)]
pub struct GptConfig {
    pub vocab_size: usize,
    pub n_embd: usize,
    pub n_head: usize,
    pub n_layer: usize,
    pub block_size: usize,
    pub dropout: f64,
    pub layer_norm_epsilon: f64,
}

impl GptConfig {
    /// Feature width of a single attention head.
    pub fn head_size(&self) -> usize {
        self.n_embd / self.n_head
    }

    pub fn validate(&self) -> Result<()> {
        if self.vocab_size == 0 {
            return Err(TensorError::InvalidConfig(
                "vocab_size must be positive".to_string(),
            ));
        }
        if self.n_embd == 0 {
            return Err(TensorError::InvalidConfig(
                "n_embd must be positive".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(TensorError::InvalidConfig(
                "block_size must be positive".to_string(),
            ));
        }
        if self.n_head == 0 || self.n_embd % self.n_head != 0 {
            return Err(TensorError::InvalidConfig(format!(
                "n_embd ({}) must split evenly across n_head ({})",
                self.n_embd, self.n_head
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(TensorError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }
}

/// Position-wise feed-forward: expand to `4 * n_embd`, GELU, contract.
#[derive(Debug)]
pub struct FeedForward<T: TensorElem> {
    pub fc: Linear<T>,
    pub proj: Linear<T>,
    dropout: Dropout,
}

impl<T: TensorElem + Float> FeedForward<T> {
    pub fn new(fc: Linear<T>, proj: Linear<T>, dropout: Dropout) -> Self {
        Self { fc, proj, dropout }
    }

    pub fn init<R: Rng>(n_embd: usize, dropout: f64, rng: &mut R) -> Result<Self> {
        let fc = Linear::init(n_embd, 4 * n_embd, true, rng);
        let proj = Linear::init(4 * n_embd, n_embd, true, rng);
        Ok(Self::new(fc, proj, Dropout::new(dropout)?))
    }

    pub fn forward_t<R: Rng>(
        &self,
        x: &Tensor<T, 3, Cpu>,
        rng: Option<&mut R>,
    ) -> Result<Tensor<T, 3, Cpu>> {
        let expanded = Activation::gelu(&self.fc.forward(x)?);
        let contracted = self.proj.forward(&expanded)?;
        Ok(self.dropout.forward(&contracted, rng))
    }

    pub fn forward(&self, x: &Tensor<T, 3, Cpu>) -> Result<Tensor<T, 3, Cpu>> {
        self.forward_t(x, None::<&mut rand::rngs::StdRng>)
    }
}

impl<T: TensorElem + Float> Module<T> for FeedForward<T> {
    fn forward(&self, x: &Tensor<T, 3, Cpu>) -> Result<Tensor<T, 3, Cpu>> {
        FeedForward::forward(self, x)
    }
}

/// One transformer layer: `x + attn(ln_1(x))`, then `x + ffwd(ln_2(x))`.
///
/// Each sub-layer gets its own normalizer, applied before the sub-layer
/// (pre-norm), with the residual taken from the un-normalized input.
#[derive(Debug)]
pub struct GptBlock<T: TensorElem> {
    pub ln_1: LayerNorm<T>,
    pub attn: MultiHeadAttention<T>,
    pub ln_2: LayerNorm<T>,
    pub ffwd: FeedForward<T>,
}

impl<T: TensorElem + Float> GptBlock<T> {
    pub fn init<R: Rng>(
        config: &GptConfig,
        mask: Arc<CausalMask<T>>,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(Self {
            ln_1: LayerNorm::init(config.n_embd, config.layer_norm_epsilon),
            attn: MultiHeadAttention::init(
                config.n_embd,
                config.n_head,
                config.dropout,
                mask,
                rng,
            )?,
            ln_2: LayerNorm::init(config.n_embd, config.layer_norm_epsilon),
            ffwd: FeedForward::init(config.n_embd, config.dropout, rng)?,
        })
    }

    pub fn forward_t<R: Rng>(
        &self,
        x: &Tensor<T, 3, Cpu>,
        mut rng: Option<&mut R>,
    ) -> Result<Tensor<T, 3, Cpu>> {
        let attn_out = self.attn.forward_t(&self.ln_1.forward(x)?, rng.as_deref_mut())?;
        let x = (x + &attn_out)?;
        let ffwd_out = self.ffwd.forward_t(&self.ln_2.forward(&x)?, rng)?;
        &x + &ffwd_out
    }

    pub fn forward(&self, x: &Tensor<T, 3, Cpu>) -> Result<Tensor<T, 3, Cpu>> {
        self.forward_t(x, None::<&mut rand::rngs::StdRng>)
    }
}

impl<T: TensorElem + Float> Module<T> for GptBlock<T> {
    fn forward(&self, x: &Tensor<T, 3, Cpu>) -> Result<Tensor<T, 3, Cpu>> {
        GptBlock::forward(self, x)
    }
}

/// The full language model.
#[derive(Debug)]
pub struct GptLanguageModel<T: TensorElem> {
    pub config: GptConfig,
    pub wte: Embedding<T>,
    pub wpe: Embedding<T>,
    pub blocks: Vec<GptBlock<T>>,
    pub ln_f: LayerNorm<T>,
    pub lm_head: Linear<T>,
}

impl<T: TensorElem + Float> GptLanguageModel<T> {
    /// Validates the config, then draws every parameter from `rng` in a
    /// fixed order: embeddings, blocks front to back, the head last. One
    /// causal mask is built and shared across all heads.
    pub fn new<R: Rng>(config: GptConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;

        let mask = Arc::new(CausalMask::new(config.block_size));
        let wte = Embedding::init(config.vocab_size, config.n_embd, rng);
        let wpe = Embedding::init(config.block_size, config.n_embd, rng);

        let mut blocks = Vec::with_capacity(config.n_layer);
        for _ in 0..config.n_layer {
            blocks.push(GptBlock::init(&config, Arc::clone(&mask), rng)?);
        }

        let ln_f = LayerNorm::init(config.n_embd, config.layer_norm_epsilon);
        let lm_head = Linear::init(config.n_embd, config.vocab_size, true, rng);

        Ok(Self {
            config,
            wte,
            wpe,
            blocks,
            ln_f,
            lm_head,
        })
    }

    /// Train-mode forward: like [`CausalLM::forward`] but threading an
    /// RNG through every dropout site.
    pub fn forward_t<R: Rng>(
        &self,
        tokens: &Tensor<usize, 2, Cpu>,
        targets: Option<&Tensor<usize, 2, Cpu>>,
        mut rng: Option<&mut R>,
    ) -> Result<(Tensor<T, 3, Cpu>, Option<T>)> {
        let [batch, time] = *tokens.shape();

        let tok_emb = self.wte.forward(tokens)?;

        let mut positions = Vec::with_capacity(batch * time);
        for _ in 0..batch {
            positions.extend(0..time);
        }
        let pos_ids = Tensor::new(positions, [batch, time])?;
        // Sequences longer than block_size fail here: position time-1 has
        // no row in the table.
        let pos_emb = self.wpe.forward(&pos_ids)?;

        let mut x = (&tok_emb + &pos_emb)?;
        for block in &self.blocks {
            x = block.forward_t(&x, rng.as_deref_mut())?;
        }
        let x = self.ln_f.forward(&x)?;
        let logits = self.lm_head.forward(&x)?;

        let loss = match targets {
            Some(targets) => {
                let flat_logits = logits
                    .clone()
                    .reshape([batch * time, self.config.vocab_size])?;
                let flat_targets = targets.clone().reshape([batch * time])?;
                Some(loss::cross_entropy(&flat_logits, &flat_targets)?)
            }
            None => None,
        };

        Ok((logits, loss))
    }
}

impl<T: TensorElem + Float> CausalLM<T> for GptLanguageModel<T> {
    fn forward(
        &self,
        tokens: &Tensor<usize, 2, Cpu>,
        targets: Option<&Tensor<usize, 2, Cpu>>,
    ) -> Result<(Tensor<T, 3, Cpu>, Option<T>)> {
        self.forward_t(tokens, targets, None::<&mut rand::rngs::StdRng>)
    }

    fn generate<R: Rng>(
        &self,
        tokens: &Tensor<usize, 2, Cpu>,
        max_new_tokens: usize,
        rng: &mut R,
    ) -> Result<Tensor<usize, 2, Cpu>> {
        let block_size = self.config.block_size;
        let mut current = tokens.clone();

        for _ in 0..max_new_tokens {
            let [batch, len] = *current.shape();

            // Slide the context window to the trailing block_size tokens.
            let window = len.min(block_size);
            let context = if window == len {
                current.clone()
            } else {
                let mut data = Vec::with_capacity(batch * window);
                for b in 0..batch {
                    let row = &current.data()[b * len..(b + 1) * len];
                    data.extend_from_slice(&row[len - window..]);
                }
                Tensor::new(data, [batch, window])?
            };

            let (logits, _) = self.forward(&context, None)?;
            let [_, time, vocab] = *logits.shape();

            // Sample batch row by batch row from the final position.
            let mut appended = Vec::with_capacity(batch * (len + 1));
            for b in 0..batch {
                let start = (b * time + (time - 1)) * vocab;
                let probs = sampling::softmax(&logits.data()[start..start + vocab]);
                let next = sampling::categorical(&probs, rng);

                appended.extend_from_slice(&current.data()[b * len..(b + 1) * len]);
                appended.push(next);
            }
            current = Tensor::new(appended, [batch, len + 1])?;
        }

        Ok(current)
    }
}
