//! Immutable sample tables referenced by table-kind arguments.

use std::sync::Arc;

/// Handle to a table owned by the engine.
///
/// Table IDs are assigned sequentially and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TableId(pub(crate) u32);

impl TableId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for TableId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "TableId({})", self.0)
    }
}

/// A shared, read-only array of samples.
///
/// Kernels clone the inner `Arc` at build time, so a table stays readable by
/// every node built from it even after the engine drops its own handle.
#[derive(Debug, Clone)]
pub struct Table {
    samples: Arc<[f32]>,
    sample_rate: f32,
}

impl Table {
    /// Creates a table from samples recorded at `sample_rate`.
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: f32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// One cycle of a sine wave, `size` samples long.
    pub fn sine(size: usize, sample_rate: f32) -> Self {
        let samples: Vec<f32> = (0..size)
            .map(|i| libm::sinf(core::f32::consts::TAU * i as f32 / size as f32))
            .collect();
        Self::new(samples, sample_rate)
    }

    /// The table contents.
    #[inline]
    pub fn samples(&self) -> &Arc<[f32]> {
        &self.samples
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true for an empty table.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample rate the table was recorded at.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Duration in seconds at the table's own sample rate.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate > 0.0 {
            self.samples.len() as f32 / self.sample_rate
        } else {
            0.0
        }
    }
}
