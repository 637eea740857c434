//! Transformer building blocks.
//!
//! # Components
//!
//! - [`CausalMask`](attention::CausalMask): the shared lower-triangular
//!   mask that keeps attention from looking ahead.
//! - [`AttentionHead`](attention::AttentionHead): scaled dot-product
//!   self-attention for one head.
//! - [`MultiHeadAttention`](attention::MultiHeadAttention): several heads
//!   fused back to the full embedding width.

pub mod attention;

pub use attention::{AttentionHead, CausalMask, MultiHeadAttention};
