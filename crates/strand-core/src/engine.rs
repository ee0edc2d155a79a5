//! The scheduler: node arena, tick loop, and tick-boundary sweep.
//!
//! [`Engine`] owns every node, object, and table. Handles ([`NodeId`],
//! [`ObjectId`], [`TableId`]) index into append-only arenas and are never
//! reused, so a handle outliving its target resolves to nothing instead of a
//! different node.
//!
//! # Tick
//!
//! [`process_tick()`](Engine::process_tick) runs one block:
//!
//! 1. drain queued [`Command`](crate::Command)s,
//! 2. re-sort nodes topologically if the wiring changed,
//! 3. run every scheduled node once, upstream first, gating its block to the
//!    active window and mixing outputting nodes into the interleaved output,
//! 4. retire finished crossfade sources and notify observers,
//! 5. sweep unreachable objects and nodes if anything was released.
//!
//! Nodes in a feedback cycle run after the acyclic part, in creation order,
//! and read whatever their upstream produced last tick.
//!
//! # Lifecycle
//!
//! ```text
//! NotBooted ──boot──► Booted ──start──► Started
//!                       ▲                  │
//!                       └──────halt────────┘
//! any ──shutdown──► ShutDown
//! ```
//!
//! Objects can be created in `Booted` and `Started`. Only `Started` produces
//! sound; `process_tick` in any other state returns silence.

use crossbeam_channel::{Receiver, Sender};

use crate::buffer::{StreamBuffer, recycle, reserve_exact};
use crate::control::Command;
use crate::error::EngineError;
use crate::kernel::ParamSignal;
use crate::node::{NodeBody, NodeData, NodeId, apply_mul_add, gate};
use crate::object::{ObjectData, ObjectId};
use crate::observer::ObserverEntry;
use crate::param::Param;
use crate::table::{Table, TableId};

/// Engine-wide settings fixed at boot.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Samples per tick.
    pub buffer_size: usize,
    /// Physical output channels.
    pub channels: usize,
    /// Propagate play/out/stop from an object to the objects it references.
    pub auto_start_children: bool,
    /// Seed for channel scrambling and kernel seeds. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Default input crossfade time in seconds.
    pub fade_time: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            buffer_size: 256,
            channels: 2,
            auto_start_children: false,
            seed: None,
            fade_time: 0.05,
        }
    }
}

impl EngineConfig {
    /// Checks that the settings describe a runnable engine.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.buffer_size == 0 {
            return Err(EngineError::InvalidConfig(
                "buffer size must be at least 1".into(),
            ));
        }
        if self.channels == 0 {
            return Err(EngineError::InvalidConfig(
                "at least one output channel is required".into(),
            ));
        }
        if !(self.fade_time.is_finite() && self.fade_time >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "fade time must be non-negative, got {}",
                self.fade_time
            )));
        }
        Ok(())
    }
}

/// Lifecycle state of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created, nothing allocated.
    NotBooted,
    /// Ready for objects; ticks produce silence.
    Booted,
    /// Processing.
    Started,
    /// Torn down; every handle is dead.
    ShutDown,
}

/// The audio-graph runtime.
pub struct Engine {
    pub(crate) config: EngineConfig,
    state: EngineState,
    pub(crate) nodes: Vec<Option<NodeData>>,
    /// Parallel to `nodes`; freed slots hold an empty buffer.
    pub(crate) buffers: Vec<StreamBuffer>,
    pub(crate) objects: Vec<Option<ObjectData>>,
    tables: Vec<Option<Table>>,
    order: Vec<usize>,
    pub(crate) topology_dirty: bool,
    pub(crate) sweep_pending: bool,
    ticks: u64,
    elapsed: u64,
    output: Vec<f32>,
    silence: Vec<f32>,
    /// Emptied between uses; keeps the tick loop allocation-free.
    pub(crate) block_scratch: Vec<&'static [f32]>,
    param_scratch: Vec<ParamSignal<'static>>,
    pub(crate) rng: fastrand::Rng,
    pub(crate) observers: Vec<ObserverEntry>,
    pub(crate) next_observer: u64,
    commands_tx: Sender<Command>,
    commands_rx: Receiver<Command>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine in [`EngineState::NotBooted`].
    pub fn new() -> Self {
        let (commands_tx, commands_rx) = crossbeam_channel::unbounded();
        Self {
            config: EngineConfig::default(),
            state: EngineState::NotBooted,
            nodes: Vec::new(),
            buffers: Vec::new(),
            objects: Vec::new(),
            tables: Vec::new(),
            order: Vec::new(),
            topology_dirty: false,
            sweep_pending: false,
            ticks: 0,
            elapsed: 0,
            output: Vec::new(),
            silence: Vec::new(),
            block_scratch: Vec::new(),
            param_scratch: Vec::new(),
            rng: fastrand::Rng::with_seed(0),
            observers: Vec::new(),
            next_observer: 0,
            commands_tx,
            commands_rx,
        }
    }

    /// Allocate output storage and accept objects.
    ///
    /// # Errors
    ///
    /// [`EngineError::AlreadyBooted`] if booted or started,
    /// [`EngineError::InvalidState`] after shutdown, and
    /// [`EngineError::InvalidConfig`] for unusable settings.
    pub fn boot(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        match self.state {
            EngineState::Booted | EngineState::Started => return Err(EngineError::AlreadyBooted),
            EngineState::ShutDown => {
                return Err(EngineError::InvalidState("boot after shutdown"));
            }
            EngineState::NotBooted => {}
        }
        config.validate()?;
        self.allocate_io(&config)?;
        self.rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        tracing::info!(
            sample_rate = config.sample_rate,
            buffer_size = config.buffer_size,
            channels = config.channels,
            "engine booted"
        );
        self.config = config;
        self.state = EngineState::Booted;
        Ok(())
    }

    fn allocate_io(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        let frames = config
            .buffer_size
            .checked_mul(config.channels)
            .ok_or(EngineError::ResourceExhausted {
                requested: usize::MAX,
            })?;
        let mut output = Vec::new();
        reserve_exact(&mut output, frames)?;
        output.resize(frames, 0.0);
        let mut silence = Vec::new();
        reserve_exact(&mut silence, config.buffer_size)?;
        silence.resize(config.buffer_size, 0.0);
        self.output = output;
        self.silence = silence;
        Ok(())
    }

    /// Apply new settings to a booted, non-running engine.
    ///
    /// Every node buffer is resized and zeroed. Every kernel is re-prepared and
    /// its state cleared.
    pub fn reconfigure(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        if self.state != EngineState::Booted {
            return Err(EngineError::InvalidState(
                "reconfigure requires a booted, stopped engine",
            ));
        }
        config.validate()?;
        for (slot, buffer) in self.nodes.iter().zip(self.buffers.iter_mut()) {
            if slot.is_some() {
                buffer.resize(config.buffer_size)?;
            }
        }
        self.allocate_io(&config)?;
        for node in self.nodes.iter_mut().flatten() {
            node.dirty = false;
            if let NodeBody::Kernel(kernel) = &mut node.body {
                kernel.prepare(config.sample_rate, config.buffer_size);
                kernel.reset();
            }
        }
        tracing::info!(
            sample_rate = config.sample_rate,
            buffer_size = config.buffer_size,
            channels = config.channels,
            "engine reconfigured"
        );
        self.config = config;
        Ok(())
    }

    /// Begin processing.
    pub fn start(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Booted => {
                self.state = EngineState::Started;
                tracing::info!("engine started");
                Ok(())
            }
            EngineState::Started => Ok(()),
            _ => Err(EngineError::InvalidState("start requires a booted engine")),
        }
    }

    /// Stop processing. Objects and play states are kept.
    pub fn halt(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Started => {
                self.state = EngineState::Booted;
                tracing::info!("engine halted");
                Ok(())
            }
            EngineState::Booted => Ok(()),
            _ => Err(EngineError::InvalidState("halt requires a booted engine")),
        }
    }

    /// Free every object, node, table, and observer. Handles stay dead.
    pub fn shutdown(&mut self) {
        for slot in &mut self.nodes {
            *slot = None;
        }
        for slot in &mut self.objects {
            *slot = None;
        }
        for slot in &mut self.tables {
            *slot = None;
        }
        self.buffers.iter_mut().for_each(|b| *b = StreamBuffer::default());
        self.observers.clear();
        self.order.clear();
        self.output = Vec::new();
        self.silence = Vec::new();
        self.state = EngineState::ShutDown;
        tracing::info!("engine shut down");
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Active settings.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ticks processed while started.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Samples processed while started.
    #[inline]
    pub fn elapsed_samples(&self) -> u64 {
        self.elapsed
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Number of objects still in the arena, released or not.
    pub fn object_count(&self) -> usize {
        self.objects.iter().flatten().count()
    }

    /// Seconds to whole samples, rounded. Negative and non-finite values map to 0.
    pub fn seconds_to_samples(&self, seconds: f32) -> u64 {
        if seconds.is_finite() && seconds > 0.0 {
            (f64::from(seconds) * f64::from(self.config.sample_rate)).round() as u64
        } else {
            0
        }
    }

    pub(crate) fn ensure_booted(&self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Booted | EngineState::Started => Ok(()),
            _ => Err(EngineError::NotBooted),
        }
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0 as usize)?.as_ref()
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.0 as usize)?.as_mut()
    }

    /// A live, unreleased object.
    pub(crate) fn object(&self, id: ObjectId) -> Result<&ObjectData, EngineError> {
        self.objects
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .filter(|o| !o.released)
            .ok_or(EngineError::UnknownObject(id))
    }

    pub(crate) fn object_mut(&mut self, id: ObjectId) -> Result<&mut ObjectData, EngineError> {
        self.objects
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .filter(|o| !o.released)
            .ok_or(EngineError::UnknownObject(id))
    }

    pub(crate) fn next_node_id(&self) -> NodeId {
        NodeId(self.nodes.len() as u32)
    }

    pub(crate) fn insert_node(&mut self, node: NodeData, buffer: StreamBuffer) -> NodeId {
        let id = node.id;
        debug_assert_eq!(id.0 as usize, self.nodes.len());
        self.nodes.push(Some(node));
        self.buffers.push(buffer);
        self.topology_dirty = true;
        id
    }

    /// Register a sample table.
    pub fn add_table(&mut self, table: Table) -> Result<TableId, EngineError> {
        self.ensure_booted()?;
        let id = TableId(self.tables.len() as u32);
        tracing::debug!(id = id.0, len = table.len(), "table added");
        self.tables.push(Some(table));
        Ok(id)
    }

    /// A registered table.
    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.0 as usize)?.as_ref()
    }

    /// Unregister a table. Kernels already reading it keep their copy.
    pub fn remove_table(&mut self, id: TableId) -> Option<Table> {
        self.tables.get_mut(id.0 as usize)?.take()
    }

    /// Interleaved output of the most recent tick.
    #[inline]
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    /// Run one tick and return its interleaved output
    /// (`buffer_size * channels` samples).
    pub fn process_tick(&mut self) -> &[f32] {
        self.drain_commands();
        self.output.fill(0.0);
        if self.state != EngineState::Started {
            return &self.output;
        }
        let tick = self.ticks;
        self.ticks += 1;
        self.elapsed += self.config.buffer_size as u64;

        if self.topology_dirty {
            self.rebuild_order();
        }
        for k in 0..self.order.len() {
            let idx = self.order[k];
            self.process_node(idx, tick);
        }

        self.settle_crossfades();
        self.notify_observers();
        if self.sweep_pending {
            self.sweep();
        }
        &self.output
    }

    /// Run `ticks` ticks and collect their interleaved output.
    pub fn render(&mut self, ticks: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(ticks * self.output.len());
        for _ in 0..ticks {
            out.extend_from_slice(self.process_tick());
        }
        out
    }

    fn process_node(&mut self, idx: usize, tick: u64) {
        let len = self.config.buffer_size;
        let channels = self.config.channels;
        let Some(node) = self.nodes[idx].as_mut() else {
            return;
        };
        if node.last_tick == Some(tick) {
            return;
        }
        node.last_tick = Some(tick);

        let Some(window) = node.schedule_block(len) else {
            if node.dirty {
                self.buffers[idx].clear();
                node.dirty = false;
            }
            return;
        };
        node.dirty = true;

        let mut block = std::mem::take(&mut self.buffers[idx]);
        let buffers = &self.buffers;
        let silence = &self.silence;
        let out = block.write();

        let mut inputs: Vec<&[f32]> = recycle(std::mem::take(&mut self.block_scratch));
        inputs.extend(node.inputs.iter().map(|&id| read_block(buffers, silence, id)));
        let mut params: Vec<ParamSignal<'_>> = recycle(std::mem::take(&mut self.param_scratch));
        params.extend(node.params.iter().map(|&p| param_signal(buffers, silence, p)));
        match &mut node.body {
            NodeBody::Kernel(kernel) => kernel.process_block(&inputs, &params, out),
            NodeBody::Crossfade(xf) => xf.process(&inputs, out),
        }
        apply_mul_add(
            out,
            param_signal(buffers, silence, node.mul),
            param_signal(buffers, silence, node.add),
        );
        gate(out, window.start, window.end);
        self.block_scratch = recycle(inputs);
        self.param_scratch = recycle(params);

        if let Some(channel) = window.channel {
            let channel = channel % channels;
            for (frame, &s) in out.iter().enumerate() {
                self.output[frame * channels + channel] += s;
            }
        }
        self.buffers[idx] = block;
    }

    /// Kahn's algorithm over node dependencies. Nodes left over by a cycle are
    /// appended in creation order.
    fn rebuild_order(&mut self) {
        let n = self.nodes.len();
        let mut in_degree = vec![0u32; n];
        let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut active = 0;

        for (i, slot) in self.nodes.iter().enumerate() {
            let Some(node) = slot else {
                continue;
            };
            active += 1;
            for dep in node.dependencies() {
                let d = dep.0 as usize;
                if d != i && self.nodes.get(d).is_some_and(Option::is_some) {
                    in_degree[i] += 1;
                    downstream[d].push(i);
                }
            }
        }

        let mut queue: Vec<usize> = (0..n)
            .rev()
            .filter(|&i| self.nodes[i].is_some() && in_degree[i] == 0)
            .collect();
        let mut sorted = Vec::with_capacity(active);
        while let Some(idx) = queue.pop() {
            sorted.push(idx);
            for &to in &downstream[idx] {
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    queue.push(to);
                }
            }
        }

        if sorted.len() < active {
            tracing::warn!(
                nodes = active - sorted.len(),
                "graph_sort: feedback cycle, cyclic nodes read the previous block"
            );
            sorted.extend((0..n).filter(|&i| self.nodes[i].is_some() && in_degree[i] > 0));
        }
        tracing::debug!("graph_sort: {} nodes in topo order", sorted.len());
        self.order = sorted;
        self.topology_dirty = false;
    }

    /// Mark from every unreleased object and free whatever is unreachable.
    ///
    /// Edges: object → its streams, faders, slot children, and linked
    /// objects; node → its upstream nodes and its owning object.
    pub(crate) fn sweep(&mut self) {
        enum Mark {
            Object(usize),
            Node(usize),
        }

        self.sweep_pending = false;
        let mut live_objects = vec![false; self.objects.len()];
        let mut live_nodes = vec![false; self.nodes.len()];
        let mut stack: Vec<Mark> = self
            .objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.as_ref().is_some_and(|o| !o.released))
            .map(|(i, _)| Mark::Object(i))
            .collect();

        while let Some(mark) = stack.pop() {
            match mark {
                Mark::Object(i) => {
                    let Some(Some(obj)) = self.objects.get(i) else {
                        continue;
                    };
                    if std::mem::replace(&mut live_objects[i], true) {
                        continue;
                    }
                    stack.extend(obj.streams.iter().map(|id| Mark::Node(id.0 as usize)));
                    if let Some(faders) = &obj.in_fader {
                        stack.extend(faders.nodes.iter().map(|id| Mark::Node(id.0 as usize)));
                    }
                    let (objects, nodes) = obj.children();
                    stack.extend(objects.iter().map(|id| Mark::Object(id.0 as usize)));
                    stack.extend(nodes.iter().map(|id| Mark::Node(id.0 as usize)));
                }
                Mark::Node(i) => {
                    let Some(Some(node)) = self.nodes.get(i) else {
                        continue;
                    };
                    if std::mem::replace(&mut live_nodes[i], true) {
                        continue;
                    }
                    stack.extend(node.dependencies().map(|id| Mark::Node(id.0 as usize)));
                    if let Some(owner) = node.owner {
                        stack.push(Mark::Object(owner.0 as usize));
                    }
                }
            }
        }

        let mut freed_objects = 0;
        for (slot, live) in self.objects.iter_mut().zip(&live_objects) {
            if !live && slot.take().is_some() {
                freed_objects += 1;
            }
        }
        let mut freed_nodes = 0;
        for ((slot, buffer), live) in self
            .nodes
            .iter_mut()
            .zip(self.buffers.iter_mut())
            .zip(&live_nodes)
        {
            if !live && slot.take().is_some() {
                *buffer = StreamBuffer::default();
                freed_nodes += 1;
            }
        }
        if freed_nodes > 0 {
            self.topology_dirty = true;
        }
        if freed_objects > 0 || freed_nodes > 0 {
            tracing::debug!(
                objects = freed_objects,
                nodes = freed_nodes,
                "graph_sweep: freed unreachable entries"
            );
        }
    }

    /// A new handle for queueing commands from other threads.
    pub fn controller(&self) -> crate::control::Controller {
        crate::control::Controller::new(self.commands_tx.clone())
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.commands_rx.try_recv() {
            if let Err(err) = self.apply(cmd) {
                tracing::warn!(%err, "queued command rejected");
            }
        }
    }
}

/// A node's last block, or silence for a freed or in-flight node.
#[inline]
fn read_block<'a>(buffers: &'a [StreamBuffer], silence: &'a [f32], id: NodeId) -> &'a [f32] {
    match buffers.get(id.0 as usize) {
        Some(b) if b.len() == silence.len() => b.read(),
        _ => silence,
    }
}

#[inline]
fn param_signal<'a>(buffers: &'a [StreamBuffer], silence: &'a [f32], param: Param) -> ParamSignal<'a> {
    match param {
        Param::Const(v) => ParamSignal::Constant(v),
        Param::Signal(id) => ParamSignal::Audio(read_block(buffers, silence, id)),
    }
}
