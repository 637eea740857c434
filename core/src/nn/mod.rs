//! Neural network building blocks.
//!
//! Layers own their parameters as plain tensors. [`Module`] is the shared
//! eval-path seam; layers that carry dropout additionally expose a
//! `forward_t` that threads the caller's RNG through every random site.

pub mod activation;
pub mod dropout;
pub mod embedding;
pub mod init;
pub mod linear;
pub mod module;
pub mod norm;
pub mod transformer;

pub use activation::Activation;
pub use dropout::Dropout;
pub use embedding::Embedding;
pub use linear::Linear;
pub use module::Module;
pub use norm::LayerNorm;
