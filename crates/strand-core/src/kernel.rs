//! The sample-processing contract every node wraps.
//!
//! A [`Kernel`] consumes zero or more input blocks plus one block of values per
//! signal parameter and writes exactly one output block. Kernels are total: they
//! always produce a block (silence if they have nothing better), so the engine's
//! tick loop never handles per-node failures.
//!
//! Signal parameters arrive as [`ParamSignal`], so a kernel can take a fast path
//! for constant values without the engine materialising a block for them.

/// A signal-parameter value for one block.
#[derive(Debug, Clone, Copy)]
pub enum ParamSignal<'a> {
    /// Same value for every sample.
    Constant(f32),
    /// One value per sample, position-aligned with the output block.
    Audio(&'a [f32]),
}

impl ParamSignal<'_> {
    /// Value at sample `i`.
    #[inline]
    pub fn at(&self, i: usize) -> f32 {
        match self {
            ParamSignal::Constant(v) => *v,
            ParamSignal::Audio(buf) => buf.get(i).copied().unwrap_or(0.0),
        }
    }

    /// Returns the constant value, or `None` for an audio-rate parameter.
    #[inline]
    pub fn as_constant(&self) -> Option<f32> {
        match self {
            ParamSignal::Constant(v) => Some(*v),
            ParamSignal::Audio(_) => None,
        }
    }
}

/// A DSP algorithm driven one block at a time.
pub trait Kernel: Send {
    /// Called once at node creation and again whenever the engine is
    /// reconfigured with a new sample rate or block size.
    fn prepare(&mut self, sample_rate: f32, block_size: usize) {
        let _ = (sample_rate, block_size);
    }

    /// Fill `out` from `inputs` and the per-parameter signals.
    ///
    /// `params` follows the order of the signal parameters the owning object
    /// kind declares. Every input slice and every audio parameter has the same
    /// length as `out`.
    fn process_block(&mut self, inputs: &[&[f32]], params: &[ParamSignal<'_>], out: &mut [f32]);

    /// Update a construction-time constant. Returns `false` if the kernel has
    /// no constant with that name.
    fn set_constant(&mut self, name: &str, value: f32) -> bool {
        let _ = (name, value);
        false
    }

    /// Clear internal state (phase, filter memory). Called after `prepare` when
    /// the engine is reconfigured.
    fn reset(&mut self) {}
}
