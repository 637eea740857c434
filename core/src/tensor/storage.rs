//! Backing buffers for tensor data.
//!
//! A storage is one flat, contiguous allocation; the tensor on top of it
//! owns the shape and strides and indexes into the buffer through them.
//! Keeping the buffer behind a trait keeps the door open for device-owned
//! memory: `Vec<T>` is the CPU storage, and a different execution target
//! would park an opaque handle here instead.

use crate::tensor::TensorElem;
use std::fmt::Debug;

/// Minimal interface a buffer must offer to back a [`Tensor`](crate::Tensor):
/// contiguous slice access and a length.
pub trait Storage<T>: Clone + Debug + Send + Sync {
    fn as_slice(&self) -> &[T];

    fn as_mut_slice(&mut self) -> &mut [T];

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrites the buffer from `src`; lengths must already agree.
    fn copy_from_slice(&mut self, src: &[T])
    where
        T: Copy,
    {
        self.as_mut_slice().copy_from_slice(src);
    }
}

impl<T: TensorElem> Storage<T> for Vec<T> {
    fn as_slice(&self) -> &[T] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}
