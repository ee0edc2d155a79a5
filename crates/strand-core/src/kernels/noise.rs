//! White noise generator.

use crate::args::ParamSpec;
use crate::kernel::{Kernel, ParamSignal};
use crate::object::{KernelInit, ObjectKind};

/// Uniform white noise in `[-1, 1)`.
///
/// Each stream gets its own generator seeded from the engine, so a seeded
/// engine renders reproducible noise.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noise;

impl ObjectKind for Noise {
    fn name(&self) -> &'static str {
        "Noise"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    fn build(&self, init: &KernelInit) -> Box<dyn Kernel> {
        Box::new(NoiseKernel {
            rng: fastrand::Rng::with_seed(init.seed),
            seed: init.seed,
        })
    }
}

struct NoiseKernel {
    rng: fastrand::Rng,
    seed: u64,
}

impl Kernel for NoiseKernel {
    fn process_block(&mut self, _inputs: &[&[f32]], _params: &[ParamSignal<'_>], out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.rng.f32() * 2.0 - 1.0;
        }
    }

    fn reset(&mut self) {
        self.rng = fastrand::Rng::with_seed(self.seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_is_bounded_and_not_constant() {
        let mut k = Noise.build(&KernelInit::new(48000.0).with_seed(7));
        let mut out = vec![0.0; 1024];
        k.process_block(&[], &[], &mut out);
        assert!(out.iter().all(|s| (-1.0..1.0).contains(s)));
        assert!(out.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn same_seed_same_noise() {
        let mut a = Noise.build(&KernelInit::new(48000.0).with_seed(42));
        let mut b = Noise.build(&KernelInit::new(48000.0).with_seed(42));
        let (mut oa, mut ob) = ([0.0; 64], [0.0; 64]);
        a.process_block(&[], &[], &mut oa);
        b.process_block(&[], &[], &mut ob);
        assert_eq!(oa, ob);
    }
}
