//! Model-level contracts.

use rand::Rng;

use crate::tensor::{Cpu, Result, Tensor, TensorElem};

/// An autoregressive language model over integer token ids.
pub trait CausalLM<T: TensorElem> {
    /// Scores every position of every sequence: `(batch, time)` token ids
    /// to `(batch, time, vocab_size)` logits.
    ///
    /// With `targets` of the same shape as `tokens`, also returns the
    /// mean cross-entropy over all `batch * time` predictions; without
    /// them the loss is simply absent.
    fn forward(
        &self,
        tokens: &Tensor<usize, 2, Cpu>,
        targets: Option<&Tensor<usize, 2, Cpu>>,
    ) -> Result<(Tensor<T, 3, Cpu>, Option<T>)>;

    /// Appends `max_new_tokens` sampled tokens to every sequence, feeding
    /// back at most the trailing `block_size` tokens of context per step.
    ///
    /// The returned tensor is `(batch, time + max_new_tokens)` and starts
    /// with the prompt unchanged.
    fn generate<R: Rng>(
        &self,
        tokens: &Tensor<usize, 2, Cpu>,
        max_new_tokens: usize,
        rng: &mut R,
    ) -> Result<Tensor<usize, 2, Cpu>>;
}
