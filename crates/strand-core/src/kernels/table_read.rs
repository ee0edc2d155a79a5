//! Looping table oscillator.

use super::wrap_phase;
use crate::args::ParamSpec;
use crate::kernel::{Kernel, ParamSignal};
use crate::object::{KernelInit, ObjectKind};
use std::sync::Arc;

/// Reads a table in a loop with linear interpolation.
///
/// # Parameters
///
/// - `table`: the table to read (required)
/// - `freq`: passes through the whole table per second (default 1)
/// - `phase`: starting position in table lengths, `[0, 1)` (default 0)
#[derive(Debug, Clone, Copy, Default)]
pub struct TableRead;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::table("table"),
    ParamSpec::signal("freq", 1.0),
    ParamSpec::constant("phase", 0.0),
];

impl ObjectKind for TableRead {
    fn name(&self) -> &'static str {
        "TableRead"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn build(&self, init: &KernelInit) -> Box<dyn Kernel> {
        let samples = init
            .table("table")
            .map(|t| Arc::clone(t.samples()))
            .unwrap_or_else(|| Arc::from(Vec::new()));
        Box::new(TableReadKernel {
            samples,
            phase: wrap_phase(init.constant("phase")),
            sample_rate: init.sample_rate,
        })
    }
}

struct TableReadKernel {
    samples: Arc<[f32]>,
    phase: f32,
    sample_rate: f32,
}

impl TableReadKernel {
    #[inline]
    fn read(&self, phase: f32) -> f32 {
        let len = self.samples.len();
        let pos = phase * len as f32;
        let i0 = (pos as usize).min(len - 1);
        let i1 = (i0 + 1) % len;
        let frac = pos - i0 as f32;
        self.samples[i0] + (self.samples[i1] - self.samples[i0]) * frac
    }
}

impl Kernel for TableReadKernel {
    fn prepare(&mut self, sample_rate: f32, _block_size: usize) {
        self.sample_rate = sample_rate;
    }

    fn process_block(&mut self, _inputs: &[&[f32]], params: &[ParamSignal<'_>], out: &mut [f32]) {
        if self.samples.is_empty() {
            out.fill(0.0);
            return;
        }
        let freq = params.first().copied().unwrap_or(ParamSignal::Constant(0.0));
        let inv_sr = 1.0 / self.sample_rate;
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = self.read(self.phase);
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
