//! One-pole lowpass filter.
//!
//! ```text
//! y[n] = x[n] + coeff * (y[n-1] - x[n])
//! ```
//!
//! where `coeff = exp(-2π * freq / sample_rate)`: 6 dB/octave rolloff, zero
//! latency, one multiply per sample.

use super::flush_denormal;
use crate::args::ParamSpec;
use crate::kernel::{Kernel, ParamSignal};
use crate::object::{KernelInit, ObjectKind};
use libm::expf;

/// One-pole (6 dB/oct) lowpass filter.
///
/// # Invariants
///
/// - `coeff` is always in [0, 1) for stable operation
/// - `state` is flushed to zero when below 1e-20 (denormal protection)
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    coeff: f32,
    sample_rate: f32,
    freq: f32,
}

impl OnePole {
    /// Create a new one-pole lowpass at `freq_hz`.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            coeff: 0.0,
            sample_rate,
            freq: freq_hz,
        };
        filter.recalculate_coeff();
        filter
    }

    /// Set the cutoff frequency. No-op when unchanged.
    #[inline]
    pub fn set_frequency(&mut self, freq_hz: f32) {
        if freq_hz != self.freq {
            self.freq = freq_hz;
            self.recalculate_coeff();
        }
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(input + self.coeff * (self.state - input));
        self.state
    }

    /// Reset filter state to zero.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }

    /// Update sample rate and recalculate the coefficient.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    fn recalculate_coeff(&mut self) {
        let freq = self.freq.clamp(0.0, self.sample_rate * 0.5);
        self.coeff = expf(-core::f32::consts::TAU * freq / self.sample_rate);
    }
}

/// Lowpass filter object.
///
/// # Parameters
///
/// - `input`: audio input (required, crossfaded on replacement)
/// - `freq`: cutoff in Hz, audio-rate capable (default 1000)
#[derive(Debug, Clone, Copy, Default)]
pub struct Tone;

const PARAMS: &[ParamSpec] = &[ParamSpec::input("input"), ParamSpec::signal("freq", 1000.0)];

impl ObjectKind for Tone {
    fn name(&self) -> &'static str {
        "Tone"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn build(&self, init: &KernelInit) -> Box<dyn Kernel> {
        Box::new(ToneKernel(OnePole::new(init.sample_rate, 1000.0)))
    }
}

struct ToneKernel(OnePole);

impl Kernel for ToneKernel {
    fn prepare(&mut self, sample_rate: f32, _block_size: usize) {
        self.0.set_sample_rate(sample_rate);
    }

    fn process_block(&mut self, inputs: &[&[f32]], params: &[ParamSignal<'_>], out: &mut [f32]) {
        let Some(input) = inputs.first() else {
            out.fill(0.0);
            return;
        };
        let freq = params.first().copied().unwrap_or(ParamSignal::Constant(1000.0));
        for (i, sample) in out.iter_mut().enumerate() {
            self.0.set_frequency(freq.at(i));
            *sample = self.0.process(input[i]);
        }
    }

    fn reset(&mut self) {
        self.0.reset();
    }
}
