//! Node parameter sources and the linear crossfade ramp.
//!
//! A node parameter is either a fixed value or the output of another node,
//! sampled position-aligned within the block ([`Param`]). [`LinearRamp`] is the
//! constant-rate ramp that drives the input crossfader from 0 to 1.

use crate::node::NodeId;

/// Source of a per-sample parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    /// The same value for every sample of the block.
    Const(f32),
    /// Read sample-for-sample from another node's output buffer.
    Signal(NodeId),
}

impl Param {
    /// The upstream node this parameter depends on, if any.
    #[inline]
    pub fn node(self) -> Option<NodeId> {
        match self {
            Param::Const(_) => None,
            Param::Signal(id) => Some(id),
        }
    }
}

impl From<f32> for Param {
    fn from(value: f32) -> Self {
        Param::Const(value)
    }
}

/// Linear ramp with a sample-counted duration.
///
/// Each call to [`advance()`](Self::advance) moves the value by a fixed
/// increment; the final step lands exactly on the target.
#[derive(Debug, Clone)]
pub struct LinearRamp {
    current: f32,
    target: f32,
    increment: f32,
    samples_remaining: u64,
}

impl LinearRamp {
    /// Create a settled ramp at `initial`.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            increment: 0.0,
            samples_remaining: 0,
        }
    }

    /// Ramp from `from` to `to` over `samples` samples.
    ///
    /// A zero-length ramp jumps straight to `to`.
    pub fn start(&mut self, from: f32, to: f32, samples: u64) {
        self.target = to;
        if samples == 0 {
            self.current = to;
            self.increment = 0.0;
            self.samples_remaining = 0;
        } else {
            self.current = from;
            self.increment = (to - from) / samples as f32;
            self.samples_remaining = samples;
        }
    }

    /// Get next ramp value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        if self.samples_remaining > 0 {
            self.current += self.increment;
            self.samples_remaining -= 1;
            if self.samples_remaining == 0 {
                self.current = self.target;
            }
        }
        self.current
    }

    /// Get current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Check if the ramp has reached its target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.samples_remaining == 0
    }
}

impl Default for LinearRamp {
    fn default() -> Self {
        Self::new(0.0)
    }
}
