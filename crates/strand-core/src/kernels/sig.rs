//! Constant or pass-through signal.

use crate::args::ParamSpec;
use crate::kernel::{Kernel, ParamSignal};
use crate::object::{KernelInit, ObjectKind};

/// Outputs its `value` parameter, which may itself be a signal.
///
/// Useful as a mixing point or as a settable control value that other
/// objects read as a signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sig;

const PARAMS: &[ParamSpec] = &[ParamSpec::signal("value", 0.0)];

impl ObjectKind for Sig {
    fn name(&self) -> &'static str {
        "Sig"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn build(&self, _init: &KernelInit) -> Box<dyn Kernel> {
        Box::new(SigKernel)
    }
}

struct SigKernel;

impl Kernel for SigKernel {
    fn process_block(&mut self, _inputs: &[&[f32]], params: &[ParamSignal<'_>], out: &mut [f32]) {
        match params.first() {
            Some(ParamSignal::Constant(v)) => out.fill(*v),
            Some(ParamSignal::Audio(buf)) => out.copy_from_slice(&buf[..out.len()]),
            None => out.fill(0.0),
        }
    }
}
