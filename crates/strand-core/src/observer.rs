//! Non-owning view hooks.
//!
//! A [`ViewObserver`] watches one object. The engine calls
//! [`update`](ViewObserver::update) after every tick with the object's
//! freshly processed blocks, and [`refresh_view`](ViewObserver::refresh_view)
//! whenever one of its parameters or its input is replaced. Observers never
//! keep their object alive: once it is swept the observer is dropped.

use crate::buffer::recycle;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::object::ObjectId;

/// Receives notifications about one object.
pub trait ViewObserver: Send {
    /// A parameter or the input of the observed object changed.
    fn refresh_view(&mut self) {}

    /// One block per stream, from the tick that just finished.
    fn update(&mut self, streams: &[&[f32]]);
}

/// Handle returned by [`Engine::observe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub(crate) struct ObserverEntry {
    id: ObserverId,
    target: ObjectId,
    observer: Box<dyn ViewObserver>,
}

impl Engine {
    /// Attach an observer to `object`.
    pub fn observe(
        &mut self,
        object: ObjectId,
        observer: Box<dyn ViewObserver>,
    ) -> Result<ObserverId, EngineError> {
        self.object(object)?;
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push(ObserverEntry {
            id,
            target: object,
            observer,
        });
        Ok(id)
    }

    /// Detach and return an observer.
    pub fn unobserve(&mut self, id: ObserverId) -> Option<Box<dyn ViewObserver>> {
        let index = self.observers.iter().position(|e| e.id == id)?;
        Some(self.observers.remove(index).observer)
    }

    pub(crate) fn refresh_observers(&mut self, object: ObjectId) {
        for entry in self.observers.iter_mut().filter(|e| e.target == object) {
            entry.observer.refresh_view();
        }
    }

    /// Deliver this tick's blocks; drop observers whose object is gone or released.
    pub(crate) fn notify_observers(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let objects = &self.objects;
        let buffers = &self.buffers;
        let mut blocks: Vec<&[f32]> = recycle(std::mem::take(&mut self.block_scratch));
        self.observers.retain_mut(|entry| {
            let Some(obj) = objects
                .get(entry.target.0 as usize)
                .and_then(Option::as_ref)
                .filter(|o| !o.released)
            else {
                tracing::debug!(object = entry.target.0, "observer dropped");
                return false;
            };
            blocks.clear();
            blocks.extend(obj.streams.iter().map(|id| buffers[id.0 as usize].read()));
            entry.observer.update(&blocks);
            true
        });
        self.block_scratch = recycle(blocks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::kernels::Sig;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counts {
        updates: AtomicUsize,
        refreshes: AtomicUsize,
        last_len: AtomicUsize,
    }

    struct Recorder(Arc<Counts>);

    impl ViewObserver for Recorder {
        fn refresh_view(&mut self) {
            self.0.refreshes.fetch_add(1, Ordering::Relaxed);
        }

        fn update(&mut self, streams: &[&[f32]]) {
            self.0.updates.fetch_add(1, Ordering::Relaxed);
            self.0.last_len.store(streams.len(), Ordering::Relaxed);
        }
    }

    fn engine() -> Engine {
        let mut engine = Engine::new();
        engine
            .boot(EngineConfig {
                buffer_size: 8,
                channels: 1,
                ..EngineConfig::default()
            })
            .unwrap();
        engine.start().unwrap();
        engine
    }

    #[test]
    fn observer_sees_every_tick_and_param_change() {
        let mut e = engine();
        let sig = e.create(&Sig, &[("value", [1.0, 2.0].into())]).unwrap();
        let counts = Arc::new(Counts::default());
        e.observe(sig, Box::new(Recorder(Arc::clone(&counts)))).unwrap();
        e.process_tick();
        e.process_tick();
        e.set_param(sig, "value", 3.0).unwrap();
        assert_eq!(counts.updates.load(Ordering::Relaxed), 2);
        assert_eq!(counts.last_len.load(Ordering::Relaxed), 2);
        assert_eq!(counts.refreshes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn observer_does_not_keep_object_alive() {
        let mut e = engine();
        let sig = e.create(&Sig, &[]).unwrap();
        let counts = Arc::new(Counts::default());
        e.observe(sig, Box::new(Recorder(Arc::clone(&counts)))).unwrap();
        e.process_tick();
        e.release(sig).unwrap();
        e.process_tick();
        assert_eq!(e.object_count(), 0);
        e.process_tick();
        assert_eq!(counts.updates.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn released_object_kept_alive_by_a_link_is_not_observed() {
        let mut e = engine();
        let owner = e.create(&Sig, &[]).unwrap();
        let helper = e.create(&Sig, &[]).unwrap();
        e.link(owner, helper).unwrap();
        let counts = Arc::new(Counts::default());
        let id = e.observe(helper, Box::new(Recorder(Arc::clone(&counts)))).unwrap();
        e.process_tick();
        e.release(helper).unwrap();
        e.process_tick();
        e.process_tick();
        assert_eq!(e.object_count(), 2);
        assert_eq!(counts.updates.load(Ordering::Relaxed), 1);
        assert!(e.unobserve(id).is_none());
    }

    #[test]
    fn unobserve_detaches() {
        let mut e = engine();
        let sig = e.create(&Sig, &[]).unwrap();
        let id = e
            .observe(sig, Box::new(Recorder(Arc::new(Counts::default()))))
            .unwrap();
        assert!(e.unobserve(id).is_some());
        assert!(e.unobserve(id).is_none());
    }
}
