//! Nodes: one kernel instance plus its play state.
//!
//! A node produces one [`StreamBuffer`](crate::StreamBuffer) per tick. Its
//! [`PlayState`] gates that output with sample accuracy: a delayed start
//! leaves silence before the start offset, and a stop wait or finite duration
//! silences everything after the end offset, inside the same block.
//!
//! ```text
//!            play(delay>0)                  delay elapses
//! Stopped ─────────────────► WaitingToPlay ──────────────► Playing / Outputting
//!    ▲                                                        │
//!    │        wait elapses                 stop(wait>0)       │
//!    └────────────────────── WaitingToStop ◄──────────────────┘
//! ```
//!
//! `stop(0)` and a finished duration go straight to `Stopped`. Calling `play`
//! on a node that is `WaitingToStop` cancels the stop without touching the
//! kernel, so the output continues with no discontinuity.

use crate::crossfader::Crossfade;
use crate::kernel::{Kernel, ParamSignal};
use crate::object::ObjectId;
use crate::param::Param;

/// Unique identifier for a node in the engine's arena.
///
/// Node IDs are assigned sequentially and never reused, so a stale handle can
/// never alias a newer node; it simply stops resolving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Processing state of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState {
    /// Silent and skipped by the tick loop.
    Stopped,
    /// Will start after `delay` more samples.
    WaitingToPlay {
        /// Samples left before the node starts.
        delay: u64,
    },
    /// Running, not routed to a physical output.
    Playing,
    /// Running and keeps running for `wait` more samples.
    WaitingToStop {
        /// Samples left before the node stops.
        wait: u64,
    },
    /// Running and mixed into physical output `channel`.
    Outputting {
        /// Physical output channel.
        channel: usize,
    },
}

/// Snapshot of a node's externally visible state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeView {
    /// The node is scheduled (waiting, running, or draining a stop wait).
    pub is_playing: bool,
    /// The node is mixed into a physical output.
    pub is_outputting: bool,
    /// Last sample of the most recent block.
    pub current_value: f32,
    /// Current play state.
    pub state: PlayState,
}

/// Active span of a block, plus the output channel to mix it into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Window {
    pub start: usize,
    pub end: usize,
    pub channel: Option<usize>,
}

/// What a node runs each tick.
pub(crate) enum NodeBody {
    /// A DSP kernel supplied by an object kind.
    Kernel(Box<dyn Kernel>),
    /// Input crossfader: weighted old sources ramping toward the last input.
    Crossfade(Crossfade),
}

/// Internal bookkeeping for a node in the arena.
pub(crate) struct NodeData {
    pub id: NodeId,
    /// Object that created this node.
    pub owner: Option<ObjectId>,
    pub body: NodeBody,
    /// Upstream nodes read as kernel inputs.
    pub inputs: Vec<NodeId>,
    /// Signal parameters in the order the object kind declares them.
    pub params: Vec<Param>,
    pub mul: Param,
    pub add: Param,
    pub state: PlayState,
    /// Samples left before a finite duration ends.
    pub remaining: Option<u64>,
    pub out_channel: Option<usize>,
    /// Tick this node last ran in.
    pub last_tick: Option<u64>,
    /// The buffer may hold non-zero samples.
    pub dirty: bool,
}

impl NodeData {
    pub fn new(id: NodeId, owner: Option<ObjectId>, body: NodeBody) -> Self {
        Self {
            id,
            owner,
            body,
            inputs: Vec::new(),
            params: Vec::new(),
            mul: Param::Const(1.0),
            add: Param::Const(0.0),
            state: PlayState::Stopped,
            remaining: None,
            out_channel: None,
            last_tick: None,
            dirty: false,
        }
    }

    /// Every node this one reads during `process`.
    pub fn dependencies(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inputs
            .iter()
            .copied()
            .chain(self.params.iter().filter_map(|p| p.node()))
            .chain(self.mul.node())
            .chain(self.add.node())
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state != PlayState::Stopped
    }

    /// Returns true while a stop wait is counting down.
    #[inline]
    pub fn is_stopping(&self) -> bool {
        matches!(self.state, PlayState::WaitingToStop { .. })
    }

    /// Stopped, or about to be. A play request acts on idle nodes.
    #[inline]
    pub fn is_idle(&self) -> bool {
        !self.is_playing() || self.is_stopping()
    }

    #[inline]
    pub fn is_outputting(&self) -> bool {
        self.is_playing() && self.out_channel.is_some()
    }

    /// Start after `delay` samples, for `duration` samples (0 = indefinitely).
    /// Clears any physical output routing.
    pub fn play(&mut self, duration: u64, delay: u64) {
        self.out_channel = None;
        self.arm(duration, delay);
    }

    /// As [`play`](Self::play), and mix into physical output `channel`.
    pub fn out(&mut self, channel: usize, duration: u64, delay: u64) {
        self.out_channel = Some(channel);
        self.arm(duration, delay);
    }

    /// Stop after `wait` more samples (0 = now).
    pub fn stop(&mut self, wait: u64) {
        match self.state {
            PlayState::Stopped => {}
            PlayState::WaitingToPlay { .. } => self.halt(),
            _ if wait == 0 => self.halt(),
            PlayState::WaitingToStop { wait: pending } => {
                self.state = PlayState::WaitingToStop {
                    wait: pending.min(wait),
                };
            }
            PlayState::Playing | PlayState::Outputting { .. } => {
                self.state = PlayState::WaitingToStop { wait };
            }
        }
    }

    fn arm(&mut self, duration: u64, delay: u64) {
        self.remaining = (duration > 0).then_some(duration);
        self.state = if delay > 0 {
            PlayState::WaitingToPlay { delay }
        } else {
            self.running_state()
        };
    }

    fn running_state(&self) -> PlayState {
        match self.out_channel {
            Some(channel) => PlayState::Outputting { channel },
            None => PlayState::Playing,
        }
    }

    fn halt(&mut self) {
        self.state = PlayState::Stopped;
        self.remaining = None;
        self.out_channel = None;
    }

    /// Advances the play-state counters across one block of `len` samples.
    ///
    /// Returns the span of the block this node is audible in, or `None` if it
    /// does not run this tick. A node whose stop wait or duration ends inside
    /// the block is `Stopped` on return, but still reports its final window.
    pub fn schedule_block(&mut self, len: usize) -> Option<Window> {
        let mut start = 0;
        match self.state {
            PlayState::Stopped => return None,
            PlayState::WaitingToPlay { delay } => {
                if delay >= len as u64 {
                    self.state = PlayState::WaitingToPlay {
                        delay: delay - len as u64,
                    };
                    return None;
                }
                start = delay as usize;
                self.state = self.running_state();
            }
            _ => {}
        }

        let channel = self.out_channel;
        let avail = (len - start) as u64;
        let mut end = len;
        let mut finished = false;

        if let Some(remaining) = self.remaining {
            if remaining <= avail {
                end = start + remaining as usize;
                finished = true;
            } else {
                self.remaining = Some(remaining - avail);
            }
        }

        if let PlayState::WaitingToStop { wait } = self.state {
            if wait <= avail {
                end = end.min(start + wait as usize);
                finished = true;
            } else {
                self.state = PlayState::WaitingToStop { wait: wait - avail };
            }
        }

        if finished {
            self.halt();
        }
        Some(Window {
            start,
            end,
            channel,
        })
    }
}

/// Post stage: `out[i] = add[i] + mul[i] * out[i]`.
#[inline]
pub(crate) fn apply_mul_add(out: &mut [f32], mul: ParamSignal<'_>, add: ParamSignal<'_>) {
    match (mul, add) {
        (ParamSignal::Constant(m), ParamSignal::Constant(a)) => {
            if m == 1.0 && a == 0.0 {
                return;
            }
            for s in out.iter_mut() {
                *s = a + m * *s;
            }
        }
        _ => {
            for (i, s) in out.iter_mut().enumerate() {
                *s = add.at(i) + mul.at(i) * *s;
            }
        }
    }
}

/// Zeroes every sample outside `[start, end)`.
#[inline]
pub(crate) fn gate(out: &mut [f32], start: usize, end: usize) {
    let end = end.min(out.len());
    out[..start.min(end)].fill(0.0);
    out[end..].fill(0.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ones;

    impl Kernel for Ones {
        fn process_block(&mut self, _: &[&[f32]], _: &[ParamSignal<'_>], out: &mut [f32]) {
            out.fill(1.0);
        }
    }

    fn node() -> NodeData {
        NodeData::new(NodeId(0), None, NodeBody::Kernel(Box::new(Ones)))
    }

    #[test]
    fn stopped_node_does_not_run() {
        let mut n = node();
        assert_eq!(n.schedule_block(64), None);
        assert!(!n.is_playing());
    }

    #[test]
    fn play_runs_whole_block() {
        let mut n = node();
        n.play(0, 0);
        assert_eq!(
            n.schedule_block(64),
            Some(Window {
                start: 0,
                end: 64,
                channel: None
            })
        );
        assert_eq!(n.state, PlayState::Playing);
    }

    #[test]
    fn delay_starts_on_exact_sample() {
        let mut n = node();
        n.play(0, 100);
        assert_eq!(n.schedule_block(64), None);
        let w = n.schedule_block(64).unwrap();
        assert_eq!(w.start, 36);
        assert_eq!(n.state, PlayState::Playing);
    }

    #[test]
    fn delay_of_exact_block_multiple_starts_at_zero() {
        let mut n = node();
        n.play(0, 128);
        assert_eq!(n.schedule_block(64), None);
        assert_eq!(n.schedule_block(64), None);
        assert_eq!(n.schedule_block(64).unwrap().start, 0);
    }

    #[test]
    fn duration_counts_from_actual_start() {
        let mut n = node();
        n.play(50, 40);
        let w = n.schedule_block(64).unwrap();
        assert_eq!((w.start, w.end), (40, 64));
        let w = n.schedule_block(64).unwrap();
        assert_eq!((w.start, w.end), (0, 26));
        assert_eq!(n.state, PlayState::Stopped);
    }

    #[test]
    fn stop_wait_ends_inside_block() {
        let mut n = node();
        n.play(0, 0);
        n.stop(100);
        assert!(matches!(n.state, PlayState::WaitingToStop { wait: 100 }));
        assert_eq!(n.schedule_block(64).unwrap().end, 64);
        assert_eq!(n.schedule_block(64).unwrap().end, 36);
        assert_eq!(n.state, PlayState::Stopped);
        assert_eq!(n.schedule_block(64), None);
    }

    #[test]
    fn stop_zero_is_immediate() {
        let mut n = node();
        n.out(3, 0, 0);
        n.stop(0);
        assert_eq!(n.state, PlayState::Stopped);
        assert_eq!(n.out_channel, None);
    }

    #[test]
    fn stop_while_waiting_to_play_cancels() {
        let mut n = node();
        n.play(0, 1000);
        n.stop(500);
        assert_eq!(n.state, PlayState::Stopped);
    }

    #[test]
    fn replay_cancels_pending_stop() {
        let mut n = node();
        n.play(0, 0);
        n.stop(32);
        n.play(0, 0);
        assert_eq!(n.state, PlayState::Playing);
        assert_eq!(n.schedule_block(64).unwrap().end, 64);
    }

    #[test]
    fn out_reports_channel_and_play_clears_it() {
        let mut n = node();
        n.out(2, 0, 0);
        assert_eq!(n.state, PlayState::Outputting { channel: 2 });
        assert!(n.is_outputting());
        assert_eq!(n.schedule_block(8).unwrap().channel, Some(2));
        n.play(0, 0);
        assert!(!n.is_outputting());
    }

    #[test]
    fn delayed_out_becomes_outputting() {
        let mut n = node();
        n.out(1, 0, 10);
        assert!(matches!(n.state, PlayState::WaitingToPlay { delay: 10 }));
        n.schedule_block(64);
        assert_eq!(n.state, PlayState::Outputting { channel: 1 });
    }

    #[test]
    fn outputting_node_keeps_channel_while_draining() {
        let mut n = node();
        n.out(1, 0, 0);
        n.stop(100);
        assert!(n.is_outputting());
        assert_eq!(n.schedule_block(64).unwrap().channel, Some(1));
    }

    #[test]
    fn stop_wait_counts_as_idle() {
        let mut n = node();
        assert!(n.is_idle());
        n.play(0, 0);
        assert!(!n.is_idle() && !n.is_stopping());
        n.stop(10);
        assert!(n.is_playing() && n.is_stopping() && n.is_idle());
        n.play(0, 0);
        assert!(!n.is_idle());
    }

    #[test]
    fn gate_zeroes_outside_window() {
        let mut out = [1.0; 8];
        gate(&mut out, 2, 5);
        assert_eq!(out, [0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn mul_add_post_stage() {
        let mut out = [1.0, 2.0, 3.0];
        let mul = [2.0, 0.0, -1.0];
        apply_mul_add(&mut out, ParamSignal::Audio(&mul), ParamSignal::Constant(0.5));
        assert_eq!(out, [2.5, 0.5, -2.5]);
    }

    #[test]
    fn dependencies_cover_inputs_params_and_post_stage() {
        let mut n = node();
        n.inputs = vec![NodeId(1)];
        n.params = vec![Param::Signal(NodeId(2)), Param::Const(3.0)];
        n.mul = Param::Signal(NodeId(4));
        let deps: Vec<_> = n.dependencies().collect();
        assert_eq!(deps, vec![NodeId(1), NodeId(2), NodeId(4)]);
    }
}
