//! Reference object kinds.
//!
//! Each module pairs a [`Kernel`](crate::Kernel) with the
//! [`ObjectKind`](crate::ObjectKind) that declares its parameters and builds
//! one kernel per stream.
//!
//! | Kind | Parameters |
//! |------|------------|
//! | [`Sig`] | `value` |
//! | [`Sine`] | `freq`, `phase` |
//! | [`Noise`] | none |
//! | [`TableRead`] | `table`, `freq`, `phase` |
//! | [`Tone`] | `input`, `freq` |
//!
//! Every kind also takes the implicit trailing `mul` and `add` parameters.

mod noise;
mod sig;
mod sine;
mod table_read;
mod tone;

pub use noise::Noise;
pub use sig::Sig;
pub use sine::Sine;
pub use table_read::TableRead;
pub use tone::{OnePole, Tone};

/// Flush subnormal values to zero.
#[allow(clippy::inline_always)]
#[inline(always)]
pub(crate) fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Wraps a phase accumulator back into `[0, 1)`.
#[inline]
pub(crate) fn wrap_phase(phase: f32) -> f32 {
    phase - libm::floorf(phase)
}
