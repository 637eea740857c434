//! Model architectures.
//!
//! # Example
//!
//! ```rust
//! use nanogpt_rs::models::gpt::{GptConfig, GptLanguageModel};
//! use nanogpt_rs::models::traits::CausalLM;
//! use nanogpt_rs::tensor::Tensor;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let config = GptConfig {
//!     vocab_size: 16,
//!     n_embd: 8,
//!     n_head: 2,
//!     n_layer: 1,
//!     block_size: 4,
//!     dropout: 0.0,
//!     layer_norm_epsilon: 1e-5,
//! };
//! let mut rng = StdRng::seed_from_u64(0);
//! let model = GptLanguageModel::<f64>::new(config, &mut rng).unwrap();
//!
//! let tokens = Tensor::new(vec![3usize, 1, 4], [1, 3]).unwrap();
//! let (logits, _) = model.forward(&tokens, None).unwrap();
//! assert_eq!(logits.shape(), &[1, 3, 16]);
//! ```

pub mod gpt;
pub mod traits;
