//! Click-free input replacement.
//!
//! Every object with an audio input reads it through one fader node per input
//! stream. A fader blends a weighted sum of previous sources with the current
//! one as `t` ramps linearly from 0 to 1:
//!
//! ```text
//! out[i] = (1 - t) * Σ w_k * old_k[i] + t * new[i]
//! ```
//!
//! Replacing the input mid-fade folds the current blend into the old side,
//! so the output continues from exactly where it was. Old sources are dropped
//! once the ramp completes, which leaves them free for the sweep.

use crate::args::{Arg, ArgKind, wrap};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::node::{NodeBody, NodeId};
use crate::object::ObjectId;
use crate::param::LinearRamp;

/// Crossfade state held by a fader node.
///
/// The node's inputs are the old sources followed by the current one.
#[derive(Debug, Clone)]
pub(crate) struct Crossfade {
    ramp: LinearRamp,
    old_weights: Vec<f32>,
}

impl Crossfade {
    /// A settled fader passing its single input straight through.
    pub fn new() -> Self {
        Self {
            ramp: LinearRamp::new(1.0),
            old_weights: Vec::new(),
        }
    }

    pub fn process(&mut self, inputs: &[&[f32]], out: &mut [f32]) {
        let Some((new, old)) = inputs.split_last() else {
            out.fill(0.0);
            return;
        };
        if old.is_empty() && self.ramp.is_settled() {
            out.copy_from_slice(&new[..out.len()]);
            return;
        }
        for (i, s) in out.iter_mut().enumerate() {
            let t = self.ramp.get();
            let held: f32 = self
                .old_weights
                .iter()
                .zip(old)
                .map(|(w, src)| w * src[i])
                .sum();
            *s = (1.0 - t) * held + t * new[i];
            self.ramp.advance();
        }
    }

    /// Start fading from the current blend to `source` over `fade_samples`.
    ///
    /// `inputs` is the fader node's input list and is rewritten in place.
    pub fn retarget(&mut self, inputs: &mut Vec<NodeId>, source: NodeId, fade_samples: u64) {
        let t = self.ramp.get();
        let mut weights: Vec<f32> = self.old_weights.iter().map(|w| w * (1.0 - t)).collect();
        if !inputs.is_empty() {
            weights.push(t);
        }
        let (kept, kept_weights): (Vec<NodeId>, Vec<f32>) = inputs
            .iter()
            .zip(weights)
            .filter(|(_, w)| *w > 0.0)
            .map(|(id, w)| (*id, w))
            .unzip();
        *inputs = kept;
        inputs.push(source);
        self.old_weights = kept_weights;
        self.ramp.start(0.0, 1.0, fade_samples);
    }

    /// Drop the old sources once the ramp has finished. Returns true if any
    /// input was removed.
    pub fn settle(&mut self, inputs: &mut Vec<NodeId>) -> bool {
        if !self.ramp.is_settled() || self.old_weights.is_empty() {
            return false;
        }
        self.old_weights.clear();
        let keep = inputs.len().saturating_sub(1);
        inputs.drain(..keep);
        true
    }
}

/// Fader nodes of one object, one per input stream.
#[derive(Debug, Clone)]
pub(crate) struct InputCrossfader {
    pub nodes: Vec<NodeId>,
}

impl Engine {
    /// Replace the audio input of `object`, crossfading over `fadetime` seconds.
    ///
    /// Fader `i` fades to stream `i` of the new input, wrapping when the new
    /// input has fewer streams. The object's stream count is unchanged.
    pub fn set_input(
        &mut self,
        object: ObjectId,
        input: impl Into<Arg>,
        fadetime: f32,
    ) -> Result<(), EngineError> {
        let input = input.into();
        let obj = self.object(object)?;
        let kind = obj.kind;
        let faders = match &obj.in_fader {
            Some(f) => f.nodes.clone(),
            None => return Err(EngineError::NoInputSlot(kind.name())),
        };
        let (position, spec) = kind
            .params()
            .iter()
            .enumerate()
            .find(|(_, s)| s.kind == ArgKind::Input)
            .ok_or(EngineError::NoInputSlot(kind.name()))?;
        if let Err(err) = spec.check(kind.name(), position, &input) {
            tracing::error!(object = kind.name(), %err, "set_input rejected");
            return Err(err);
        }
        let sources = self.signal_nodes(&input)?;
        let fade = self.seconds_to_samples(fadetime);

        for (i, fader) in faders.iter().enumerate() {
            let Some(&source) = wrap(&sources, i) else {
                continue;
            };
            if let Some(node) = self.node_mut(*fader) {
                if let NodeBody::Crossfade(xf) = &mut node.body {
                    xf.retarget(&mut node.inputs, source, fade);
                }
            }
        }

        let spec = *spec;
        self.store_arg(object, position, &spec, &input);
        self.topology_dirty = true;
        tracing::debug!(id = object.0, fade, "graph_set_input");
        self.refresh_observers(object);
        Ok(())
    }

    /// Drop old sources from faders whose ramp has completed.
    pub(crate) fn settle_crossfades(&mut self) {
        let mut settled = false;
        for node in self.nodes.iter_mut().flatten() {
            if let NodeBody::Crossfade(xf) = &mut node.body {
                settled |= xf.settle(&mut node.inputs);
            }
        }
        if settled {
            self.topology_dirty = true;
            self.sweep_pending = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OLD: [f32; 4] = [0.0; 4];
    const NEW: [f32; 4] = [1.0; 4];

    #[test]
    fn settled_fader_passes_input_through() {
        let mut xf = Crossfade::new();
        let src = [0.1, 0.2, 0.3, 0.4];
        let mut out = [0.0; 4];
        xf.process(&[&src], &mut out);
        assert_eq!(out, src);
    }

    #[test]
    fn fade_runs_from_old_to_new_monotonically() {
        let mut xf = Crossfade::new();
        let mut inputs = vec![NodeId(0)];
        xf.retarget(&mut inputs, NodeId(1), 8);
        assert_eq!(inputs, vec![NodeId(0), NodeId(1)]);

        let mut first = [0.0; 4];
        xf.process(&[&OLD, &NEW], &mut first);
        let mut second = [0.0; 4];
        xf.process(&[&OLD, &NEW], &mut second);

        // t = 0 is exactly the old source.
        assert_eq!(first[0], 0.0);
        let all: Vec<f32> = first.iter().chain(second.iter()).copied().collect();
        for pair in all.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        let mut third = [0.0; 4];
        xf.process(&[&OLD, &NEW], &mut third);
        assert_eq!(third, NEW);
    }

    #[test]
    fn restart_mid_fade_continues_from_current_value() {
        let mut xf = Crossfade::new();
        let mut inputs = vec![NodeId(0)];
        xf.retarget(&mut inputs, NodeId(1), 8);
        let mut out = [0.0; 4];
        xf.process(&[&OLD, &NEW], &mut out);

        xf.retarget(&mut inputs, NodeId(2), 8);
        assert_eq!(inputs, vec![NodeId(0), NodeId(1), NodeId(2)]);
        let third = [-1.0; 4];
        let mut next = [0.0; 4];
        xf.process(&[&OLD, &NEW, &third], &mut next);
        // Blend at the restart point was 0.5; the new fade starts there.
        assert!((next[0] - 0.5).abs() < 1e-6);
        assert!(next[3] < next[0]);
    }

    #[test]
    fn settle_drops_old_sources_after_ramp() {
        let mut xf = Crossfade::new();
        let mut inputs = vec![NodeId(0)];
        xf.retarget(&mut inputs, NodeId(1), 4);
        assert!(!xf.settle(&mut inputs));
        let mut out = [0.0; 4];
        xf.process(&[&OLD, &NEW], &mut out);
        assert!(xf.settle(&mut inputs));
        assert_eq!(inputs, vec![NodeId(1)]);
        assert!(!xf.settle(&mut inputs));
        assert_eq!(inputs, vec![NodeId(1)]);
    }

    #[test]
    fn zero_fadetime_switches_immediately() {
        let mut xf = Crossfade::new();
        let mut inputs = vec![NodeId(0)];
        xf.retarget(&mut inputs, NodeId(1), 0);
        let mut out = [0.0; 4];
        xf.process(&[&OLD, &NEW], &mut out);
        assert_eq!(out, NEW);
    }

    #[test]
    fn fully_faded_sources_are_pruned_on_retarget() {
        let mut xf = Crossfade::new();
        let mut inputs = vec![NodeId(0)];
        xf.retarget(&mut inputs, NodeId(1), 4);
        let mut out = [0.0; 4];
        xf.process(&[&OLD, &NEW], &mut out);
        xf.retarget(&mut inputs, NodeId(2), 4);
        // Old source 0 had weight zero at t = 1.
        assert_eq!(inputs, vec![NodeId(1), NodeId(2)]);
    }
}
