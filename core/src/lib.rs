//! # nanogpt-rs
//!
//! A small decoder-only transformer language model in pure Rust: causal
//! self-attention, pre-norm residual blocks, token and position embeddings,
//! cross-entropy loss, and autoregressive sampling, built on a rank-typed
//! CPU tensor core.
//!
//! ## Modules
//!
//! - [`mod@tensor`]: row-major tensors with compile-time rank and a device seam.
//! - [`nn`]: layers (linear, embedding, layer norm, dropout, attention).
//! - [`models`]: the GPT-style language model and its configuration.
//! - [`loss`]: cross-entropy over flattened logits.
//! - [`sampling`]: softmax and categorical draws for generation.
//!
//! ## Example
//!
//! ```rust
//! use nanogpt_rs::models::gpt::{GptConfig, GptLanguageModel};
//! use nanogpt_rs::models::traits::CausalLM;
//! use nanogpt_rs::tensor::Tensor;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let config = GptConfig {
//!     vocab_size: 65,
//!     n_embd: 32,
//!     n_head: 4,
//!     n_layer: 2,
//!     block_size: 8,
//!     dropout: 0.1,
//!     layer_norm_epsilon: 1e-5,
//! };
//! let mut rng = StdRng::seed_from_u64(1337);
//! let model = GptLanguageModel::<f32>::new(config, &mut rng).unwrap();
//!
//! let prompt = Tensor::new(vec![0usize, 1, 2], [1, 3]).unwrap();
//! let (logits, loss) = model.forward(&prompt, None).unwrap();
//! assert_eq!(logits.shape(), &[1, 3, 65]);
//! assert!(loss.is_none());
//!
//! let out = model.generate(&prompt, 5, &mut rng).unwrap();
//! assert_eq!(out.shape(), &[1, 8]);
//! ```

/// Creates a [`tensor::Tensor`] with the shape checked at compile time.
///
/// # Examples
///
/// ```rust
/// use nanogpt_rs::tensor;
///
/// let t = tensor!([1.0, 2.0, 3.0, 4.0], [2, 2]);
/// assert_eq!(t.shape(), &[2, 2]);
///
/// // Fails to compile:
/// // let t = tensor!([1.0, 2.0, 3.0], [2, 2]);
/// ```
#[macro_export]
macro_rules! tensor {
    ($data:expr, $shape:expr) => {{
        const DATA_LEN: usize = (&$data as &[_]).len();
        const SHAPE: [usize; (&$shape as &[_]).len()] = $shape;
        const EXPECTED_SIZE: usize = {
            let mut size = 1;
            let mut i = 0;
            while i < (&SHAPE as &[_]).len() {
                size *= SHAPE[i];
                i += 1;
            }
            size
        };

        const _: () = assert!(
            DATA_LEN == EXPECTED_SIZE,
            "Shape mismatch: data length does not match shape product"
        );

        // Length was checked against the shape product above.
        $crate::tensor::Tensor::new($data.to_vec(), $shape).unwrap()
    }};
}

pub mod loss;
pub mod models;
pub mod nn;
pub mod sampling;
pub mod tensor;

pub use tensor::{Cpu, Device, Storage, Tensor, TensorElem, TensorError, TensorOps};
