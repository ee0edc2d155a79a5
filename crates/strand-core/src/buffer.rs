//! Per-node sample blocks.
//!
//! A [`StreamBuffer`] holds one engine block of mono samples. Every node owns
//! exactly one; downstream nodes only ever read it. Storage is reserved with
//! fallible allocation so an oversized block size surfaces as
//! [`EngineError::ResourceExhausted`] instead of aborting the process.

use crate::error::EngineError;

/// One block of audio samples produced by a single node.
#[derive(Debug, Default, Clone)]
pub struct StreamBuffer {
    samples: Vec<f32>,
}

impl StreamBuffer {
    /// Allocates a zeroed buffer of `size` samples.
    pub fn allocate(size: usize) -> Result<Self, EngineError> {
        let mut samples = Vec::new();
        reserve_exact(&mut samples, size)?;
        samples.resize(size, 0.0);
        Ok(Self { samples })
    }

    /// Read-only view of the block.
    #[inline]
    pub fn read(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable view of the block, used by the owning node while it processes.
    #[inline]
    pub fn write(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Fills the block with zeros.
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
    }

    /// Resizes to a new block size, zeroing the whole block.
    pub fn resize(&mut self, size: usize) -> Result<(), EngineError> {
        if size > self.samples.len() {
            let extra = size - self.samples.len();
            reserve_exact(&mut self.samples, extra)?;
        }
        self.samples.resize(size, 0.0);
        self.samples.fill(0.0);
        Ok(())
    }

    /// Returns the number of samples in the block.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the block has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Last sample of the block, or 0.0 for an empty block.
    #[inline]
    pub fn current_value(&self) -> f32 {
        self.samples.last().copied().unwrap_or(0.0)
    }
}

/// Reserves `additional` samples, mapping allocator failure to an engine error.
pub(crate) fn reserve_exact(buf: &mut Vec<f32>, additional: usize) -> Result<(), EngineError> {
    buf.try_reserve_exact(additional)
        .map_err(|_| EngineError::ResourceExhausted {
            requested: additional,
        })
}

/// Empties `v` and hands its allocation back typed for a new borrow.
///
/// Relies on in-place collection, so the allocation survives when `T` and
/// `U` share a layout (as two lifetimes of the same reference type do).
pub(crate) fn recycle<T, U>(mut v: Vec<T>) -> Vec<U> {
    v.clear();
    v.into_iter().filter_map(|_| None).collect()
}
