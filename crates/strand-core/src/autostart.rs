//! Object-level play, out, and stop, with propagation to children.
//!
//! Starting or stopping an object acts on all of its streams. When
//! [`EngineConfig::auto_start_children`](crate::EngineConfig) is set, the
//! action also reaches every object held in its child slots or linked to it,
//! depth first, skipping children that opted out
//! ([`set_allow_auto_start`](Engine::set_allow_auto_start)) or are already in
//! the requested state. Routing to outputs never propagates: children of an
//! object sent to `out` are only played.
//!
//! # Stop waits
//!
//! Each object decides its own wait. An object bound as another object's
//! `mul` stops immediately unless it opted into waits, so an envelope does
//! not hold a fading source open. An explicit stop delay replaces the wait
//! for that object only; its children still see the caller's wait.

use crate::engine::Engine;
use crate::error::EngineError;
use crate::node::{NodeData, NodeId};
use crate::object::ObjectId;

#[derive(Clone, Copy, Debug)]
enum Action {
    Play { duration: u64, delay: u64 },
    Stop { wait: f32 },
}

impl Engine {
    /// Start every stream of `object` after `delay` seconds, for `duration`
    /// seconds (0 = until stopped).
    pub fn play(&mut self, object: ObjectId, duration: f32, delay: f32) -> Result<(), EngineError> {
        let streams = self.object(object)?.streams.clone();
        let duration = self.seconds_to_samples(duration);
        let delay = self.seconds_to_samples(delay);
        self.play_streams(&streams, duration, delay);
        tracing::debug!(id = object.0, duration, delay, "object play");
        self.propagate(object, Action::Play { duration, delay });
        Ok(())
    }

    /// Start every stream of `object` and route it to a physical output.
    ///
    /// With `channel >= 0`, stream `i` goes to
    /// `(channel + i * increment) % channels`. A negative `channel` scrambles:
    /// streams are assigned in a random non-identity order to
    /// `(k * increment) % channels`.
    pub fn out(
        &mut self,
        object: ObjectId,
        channel: i32,
        increment: usize,
        duration: f32,
        delay: f32,
    ) -> Result<(), EngineError> {
        let streams = self.object(object)?.streams.clone();
        let duration = self.seconds_to_samples(duration);
        let delay = self.seconds_to_samples(delay);
        let channels = self.assign_channels(streams.len(), channel, increment);
        for (id, ch) in streams.iter().zip(&channels) {
            if let Some(node) = self.node_mut(*id) {
                node.out(*ch, duration, delay);
            }
        }
        tracing::debug!(id = object.0, ?channels, "object out");
        self.propagate(object, Action::Play { duration, delay });
        Ok(())
    }

    /// Stop every stream of `object` after `wait` seconds.
    pub fn stop(&mut self, object: ObjectId, wait: f32) -> Result<(), EngineError> {
        let obj = self.object(object)?;
        let own = obj.effective_wait(wait);
        let streams = obj.streams.clone();
        let samples = self.seconds_to_samples(own);
        self.stop_streams(&streams, samples);
        tracing::debug!(id = object.0, wait = samples, "object stop");
        self.propagate(object, Action::Stop { wait });
        Ok(())
    }

    fn play_streams(&mut self, streams: &[NodeId], duration: u64, delay: u64) {
        for id in streams {
            if let Some(node) = self.node_mut(*id) {
                node.play(duration, delay);
            }
        }
    }

    fn any_stopping(&self, streams: &[NodeId]) -> bool {
        streams
            .iter()
            .any(|id| self.node(*id).is_some_and(NodeData::is_stopping))
    }

    fn stop_streams(&mut self, streams: &[NodeId], wait: u64) {
        for id in streams {
            if let Some(node) = self.node_mut(*id) {
                node.stop(wait);
            }
        }
    }

    fn propagate(&mut self, root: ObjectId, action: Action) {
        if !self.config.auto_start_children {
            return;
        }
        let mut visited = vec![false; self.objects.len()];
        visited[root.0 as usize] = true;
        let mut pending_objects = Vec::new();
        let mut pending_nodes = Vec::new();
        if let Ok(obj) = self.object(root) {
            (pending_objects, pending_nodes) = obj.children();
        }

        let node_wait = match action {
            Action::Stop { wait } => self.seconds_to_samples(wait),
            Action::Play { .. } => 0,
        };

        loop {
            for id in pending_nodes.drain(..) {
                let Some(node) = self.node_mut(id) else {
                    continue;
                };
                match action {
                    Action::Play { duration, delay } if node.is_idle() => node.play(duration, delay),
                    Action::Stop { .. } if node.is_playing() => node.stop(node_wait),
                    _ => {}
                }
            }

            let Some(id) = pending_objects.pop() else {
                break;
            };
            let i = id.0 as usize;
            if visited.get(i).copied().unwrap_or(true) {
                continue;
            }
            visited[i] = true;
            let Ok(obj) = self.object(id) else {
                continue;
            };
            if !obj.allow_auto_start {
                continue;
            }
            let streams = obj.streams.clone();
            let (objects, nodes) = obj.children();
            let wait = obj.effective_wait(match action {
                Action::Stop { wait } => wait,
                Action::Play { .. } => 0.0,
            });
            match action {
                Action::Play { duration, delay } => {
                    // A stop wait in progress is cancelled; running streams keep their duration.
                    let idle: Vec<NodeId> = streams
                        .iter()
                        .copied()
                        .filter(|s| self.node(*s).is_some_and(NodeData::is_idle))
                        .collect();
                    if idle.is_empty() || (self.is_playing(id) && !self.any_stopping(&streams)) {
                        continue;
                    }
                    self.play_streams(&idle, duration, delay);
                }
                Action::Stop { .. } => {
                    if !self.is_playing(id) {
                        continue;
                    }
                    let samples = self.seconds_to_samples(wait);
                    self.stop_streams(&streams, samples);
                }
            }
            tracing::trace!(id = id.0, ?action, "auto-start child");
            pending_objects.extend(objects);
            pending_nodes.extend(nodes);
        }
    }

    /// Physical channel for each of `count` streams.
    pub(crate) fn assign_channels(&mut self, count: usize, channel: i32, increment: usize) -> Vec<usize> {
        let channels = self.config.channels.max(1);
        let step = increment % channels;
        let base = usize::try_from(channel).map_or(0, |c| c % channels);
        let natural: Vec<usize> = std::iter::successors(Some(base), |c| Some((c + step) % channels))
            .take(count)
            .collect();
        if channel >= 0 {
            return natural;
        }
        // Re-draw until the assignment differs from the unscrambled one, when it can.
        let distinct = natural.iter().any(|&c| c != natural[0]);
        let mut order: Vec<usize> = (0..count).collect();
        let mut assigned = vec![0; count];
        loop {
            self.rng.shuffle(&mut order);
            for (k, &stream) in order.iter().enumerate() {
                assigned[stream] = natural[k];
            }
            if !distinct || assigned != natural {
                break;
            }
        }
        assigned
    }
}

#[cfg(test)]
mod tests {
    use crate::args::Arg;
    use crate::engine::{Engine, EngineConfig};
    use crate::kernels::{Sig, Sine, Tone};
    use crate::node::PlayState;

    fn engine(auto_start: bool) -> Engine {
        engine_with_channels(auto_start, 8)
    }

    fn engine_with_channels(auto_start: bool, channels: usize) -> Engine {
        let mut engine = Engine::new();
        engine
            .boot(EngineConfig {
                sample_rate: 1000.0,
                buffer_size: 10,
                channels,
                auto_start_children: auto_start,
                seed: Some(42),
                ..EngineConfig::default()
            })
            .unwrap();
        engine.start().unwrap();
        engine
    }

    #[test]
    fn fixed_channel_assignment_wraps() {
        let mut e = engine(false);
        assert_eq!(e.assign_channels(4, 6, 1), vec![6, 7, 0, 1]);
        assert_eq!(e.assign_channels(3, 0, 2), vec![0, 2, 4]);
    }

    #[test]
    fn scramble_is_a_non_identity_permutation() {
        let mut e = engine(false);
        for _ in 0..20 {
            let mut channels = e.assign_channels(8, -1, 1);
            assert_ne!(channels, (0..8).collect::<Vec<_>>());
            channels.sort_unstable();
            assert_eq!(channels, (0..8).collect::<Vec<_>>());
        }
        assert_eq!(e.assign_channels(1, -1, 1), vec![0]);
    }

    #[test]
    fn scramble_never_reproduces_the_unscrambled_layout() {
        let mut e = engine_with_channels(false, 2);
        for _ in 0..200 {
            let mut channels = e.assign_channels(4, -1, 1);
            assert_ne!(channels, vec![0, 1, 0, 1]);
            channels.sort_unstable();
            assert_eq!(channels, vec![0, 0, 1, 1]);
        }
        // Every stream lands on channel 0, so there is nothing to scramble.
        assert_eq!(e.assign_channels(3, -1, 2), vec![0, 0, 0]);
        assert!(e.assign_channels(0, -1, 1).is_empty());
    }

    #[test]
    fn huge_increment_and_channel_do_not_overflow() {
        let mut e = engine(false);
        assert_eq!(e.assign_channels(3, 1, usize::MAX), vec![1, 0, 7]);
        assert_eq!(e.assign_channels(2, i32::MAX, usize::MAX), vec![7, 6]);
        let mut scrambled = e.assign_channels(8, -1, usize::MAX);
        scrambled.sort_unstable();
        assert_eq!(scrambled, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn play_without_auto_start_leaves_children_alone() {
        let mut e = engine(false);
        let src = e.create(&Sine, &[]).unwrap();
        let lp = e.create(&Tone, &[("input", src.into())]).unwrap();
        e.out(lp, 0, 1, 0.0, 0.0).unwrap();
        assert!(e.is_outputting(lp));
        assert!(!e.is_playing(src));
    }

    #[test]
    fn out_plays_children_without_routing_them() {
        let mut e = engine(true);
        let src = e.create(&Sine, &[]).unwrap();
        let lfo = e.create(&Sine, &[("freq", 2.0.into())]).unwrap();
        let lp = e
            .create(&Tone, &[("input", src.into()), ("mul", lfo.into())])
            .unwrap();
        e.out(lp, 0, 1, 0.0, 0.0).unwrap();
        assert!(e.is_outputting(lp));
        assert!(e.is_playing(src) && !e.is_outputting(src));
        assert!(e.is_playing(lfo) && !e.is_outputting(lfo));
    }

    #[test]
    fn opted_out_child_is_skipped() {
        let mut e = engine(true);
        let src = e.create(&Sine, &[]).unwrap();
        e.set_allow_auto_start(src, false).unwrap();
        let lp = e.create(&Tone, &[("input", src.into())]).unwrap();
        e.play(lp, 0.0, 0.0).unwrap();
        assert!(!e.is_playing(src));
    }

    #[test]
    fn mul_source_stops_immediately_and_parent_waits() {
        let mut e = engine(true);
        let env = e.create(&Sig, &[("value", 1.0.into())]).unwrap();
        let osc = e.create(&Sine, &[("mul", env.into())]).unwrap();
        e.play(osc, 0.0, 0.0).unwrap();
        assert!(e.is_playing(env));
        e.stop(osc, 2.0).unwrap();
        assert!(!e.is_playing(env));
        let stream = e.stream(osc, 0).unwrap();
        assert_eq!(e.view(stream).unwrap().state, PlayState::WaitingToStop { wait: 2000 });
    }

    #[test]
    fn mul_source_can_opt_into_waits() {
        let mut e = engine(true);
        let env = e.create(&Sig, &[]).unwrap();
        e.set_use_wait_time_on_stop(env, true).unwrap();
        let osc = e.create(&Sine, &[("mul", env.into())]).unwrap();
        e.play(osc, 0.0, 0.0).unwrap();
        e.stop(osc, 1.0).unwrap();
        assert!(e.is_playing(env));
    }

    #[test]
    fn stop_delay_overrides_only_its_object() {
        let mut e = engine(true);
        let src = e.create(&Sine, &[]).unwrap();
        let lp = e.create(&Tone, &[("input", src.into())]).unwrap();
        e.set_stop_delay(lp, Some(0.5)).unwrap();
        e.play(lp, 0.0, 0.0).unwrap();
        e.stop(lp, 0.1).unwrap();
        let lp_stream = e.stream(lp, 0).unwrap();
        let src_stream = e.stream(src, 0).unwrap();
        assert_eq!(e.view(lp_stream).unwrap().state, PlayState::WaitingToStop { wait: 500 });
        assert_eq!(e.view(src_stream).unwrap().state, PlayState::WaitingToStop { wait: 100 });
    }

    #[test]
    fn shared_child_is_visited_once_and_linked_objects_follow() {
        let mut e = engine(true);
        let shared = e.create(&Sig, &[]).unwrap();
        let a = e
            .create(&Sine, &[("freq", shared.into()), ("add", shared.into())])
            .unwrap();
        let extra = e.create(&Sig, &[]).unwrap();
        e.link(a, extra).unwrap();
        e.play(a, 0.0, 0.0).unwrap();
        assert!(e.is_playing(shared));
        assert!(e.is_playing(extra));
    }

    #[test]
    fn raw_stream_children_are_played() {
        let mut e = engine(true);
        let src = e.create(&Sig, &[("value", Arg::from([1.0, 2.0]))]).unwrap();
        let second = e.stream(src, 1).unwrap();
        let osc = e.create(&Sine, &[("freq", second.into())]).unwrap();
        e.play(osc, 0.0, 0.0).unwrap();
        assert!(e.view(second).unwrap().is_playing);
        assert!(!e.view(e.stream(src, 0).unwrap()).unwrap().is_playing);
    }

    #[test]
    fn replay_cancels_stop_wait_on_children() {
        let mut e = engine(true);
        let src = e.create(&Sig, &[("value", Arg::from([1.0, 2.0]))]).unwrap();
        let second = e.stream(src, 1).unwrap();
        let env = e.create(&Sig, &[]).unwrap();
        let osc = e
            .create(&Sine, &[("freq", second.into()), ("add", env.into())])
            .unwrap();
        e.play(osc, 0.0, 0.0).unwrap();
        e.stop(osc, 0.5).unwrap();
        assert_eq!(e.view(second).unwrap().state, PlayState::WaitingToStop { wait: 500 });
        e.play(osc, 0.0, 0.0).unwrap();
        assert_eq!(e.view(second).unwrap().state, PlayState::Playing);
        let env_stream = e.stream(env, 0).unwrap();
        assert_eq!(e.view(env_stream).unwrap().state, PlayState::Playing);
    }

    #[test]
    fn dead_handle_is_an_error() {
        let mut e = engine(false);
        let a = e.create(&Sig, &[]).unwrap();
        e.release(a).unwrap();
        assert!(e.play(a, 0.0, 0.0).is_err());
    }
}
