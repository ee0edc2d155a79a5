//! Sine oscillator.

use super::wrap_phase;
use crate::args::ParamSpec;
use crate::kernel::{Kernel, ParamSignal};
use crate::object::{KernelInit, ObjectKind};
use core::f32::consts::TAU;
use libm::sinf;

/// Sine wave oscillator.
///
/// # Parameters
///
/// - `freq`: frequency in Hz, audio-rate capable (default 1000)
/// - `phase`: starting phase in cycles, `[0, 1)` (default 0)
#[derive(Debug, Clone, Copy, Default)]
pub struct Sine;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::signal("freq", 1000.0),
    ParamSpec::constant("phase", 0.0),
];

impl ObjectKind for Sine {
    fn name(&self) -> &'static str {
        "Sine"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn build(&self, init: &KernelInit) -> Box<dyn Kernel> {
        Box::new(SineKernel {
            phase: wrap_phase(init.constant("phase")),
            sample_rate: init.sample_rate,
        })
    }
}

struct SineKernel {
    /// Current phase position [0.0, 1.0)
    phase: f32,
    sample_rate: f32,
}

impl Kernel for SineKernel {
    fn prepare(&mut self, sample_rate: f32, _block_size: usize) {
        self.sample_rate = sample_rate;
    }

    fn process_block(&mut self, _inputs: &[&[f32]], params: &[ParamSignal<'_>], out: &mut [f32]) {
        let freq = params.first().copied().unwrap_or(ParamSignal::Constant(0.0));
        let inv_sr = 1.0 / self.sample_rate;
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = sinf(TAU * self.phase);
            self.phase = wrap_phase(self.phase + freq.at(i) * inv_sr);
        }
    }

    fn set_constant(&mut self, name: &str, value: f32) -> bool {
        if name == "phase" {
            self.phase = wrap_phase(value);
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_period_reaches_peak() {
        let mut k = Sine.build(&KernelInit::new(48000.0));
        // 1200 Hz at 48 kHz: 40 samples per cycle, peak at sample 10
        let mut out = [0.0; 40];
        k.process_block(&[], &[ParamSignal::Constant(1200.0)], &mut out);
        assert!(out[0].abs() < 1e-6);
        assert!((out[10] - 1.0).abs() < 1e-4, "got {}", out[10]);
        assert!((out[30] + 1.0).abs() < 1e-4, "got {}", out[30]);
    }

    #[test]
    fn phase_constant_offsets_start() {
        let init = KernelInit::new(48000.0).with_constant("phase", 0.25);
        let mut k = Sine.build(&init);
        let mut out = [0.0; 1];
        k.process_block(&[], &[ParamSignal::Constant(100.0)], &mut out);
        assert!((out[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn output_is_bounded() {
        let mut k = Sine.build(&KernelInit::new(44100.0));
        let mut out = vec![0.0; 4096];
        k.process_block(&[], &[ParamSignal::Constant(3137.0)], &mut out);
        assert!(out.iter().all(|s| s.abs() <= 1.0));
    }
}
