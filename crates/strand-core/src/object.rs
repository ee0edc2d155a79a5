//! Multi-stream objects: construction by list expansion, getters, setters.
//!
//! An object owns a fixed list of nodes (`streams`), one per expanded argument
//! position. Its kind ([`ObjectKind`]) declares the parameters; construction
//! checks every argument against its declared [`ArgKind`] before anything is
//! allocated, so a failed construction leaves the arena untouched.
//!
//! Objects remember which other objects and nodes they reference in named
//! child slots ([`Slot`]). Auto-start propagation and the tick-boundary sweep
//! both walk these slots instead of inspecting arbitrary fields.

use crate::args::{Arg, ArgKind, ParamSpec, lmax, wrap};
use crate::buffer::StreamBuffer;
use crate::crossfader::{Crossfade, InputCrossfader};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::kernel::Kernel;
use crate::node::{NodeBody, NodeData, NodeId, NodeView};
use crate::param::Param;
use crate::table::Table;

/// Unique identifier for an object in the engine's arena.
///
/// Object IDs are assigned sequentially and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

/// Construction-time values handed to [`ObjectKind::build`] for one stream.
#[derive(Debug, Clone)]
pub struct KernelInit {
    /// Index of the stream being built.
    pub stream: usize,
    /// Engine sample rate in Hz.
    pub sample_rate: f32,
    /// Engine block size in samples.
    pub block_size: usize,
    /// Per-stream seed drawn from the engine generator.
    pub seed: u64,
    constants: Vec<(&'static str, f32)>,
    tables: Vec<(&'static str, Table)>,
}

impl KernelInit {
    /// Init for stream 0 with no constants or tables.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            stream: 0,
            sample_rate,
            block_size: 256,
            seed: 0,
            constants: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Adds a constant parameter value.
    pub fn with_constant(mut self, name: &'static str, value: f32) -> Self {
        self.constants.push((name, value));
        self
    }

    /// Adds a table parameter.
    pub fn with_table(mut self, name: &'static str, table: Table) -> Self {
        self.tables.push((name, table));
        self
    }

    /// Sets the stream seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Value of a constant parameter, 0.0 if absent.
    pub fn constant(&self, name: &str) -> f32 {
        self.constants
            .iter()
            .find(|(n, _)| *n == name)
            .map_or(0.0, |(_, v)| *v)
    }

    /// A table parameter, if bound.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|(n, _)| *n == name).map(|(_, t)| t)
    }
}

/// Describes one type of object: its parameters and how to build a stream.
///
/// Signal parameters reach the kernel in declaration order through
/// [`Kernel::process_block`]; constant and table parameters arrive through
/// [`KernelInit`]. At most one `Input` parameter is supported. `mul` and `add`
/// are appended to every kind and must not be declared.
pub trait ObjectKind: Send + Sync + 'static {
    /// Kind name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Declared parameters, in positional order.
    fn params(&self) -> &'static [ParamSpec];

    /// Build the kernel for one stream.
    fn build(&self, init: &KernelInit) -> Box<dyn Kernel>;
}

const MUL_ADD: [ParamSpec; 2] = [ParamSpec::signal("mul", 1.0), ParamSpec::signal("add", 0.0)];

/// Declared parameters followed by `mul` and `add`.
pub(crate) fn full_specs(kind: &dyn ObjectKind) -> Vec<ParamSpec> {
    kind.params().iter().chain(MUL_ADD.iter()).copied().collect()
}

/// Role of a child slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    /// The crossfaded audio input.
    Input,
    /// Amplitude source for the post stage.
    Mul,
    /// Offset source for the post stage.
    Add,
    /// Any other signal or constant parameter.
    Param,
}

/// What a child slot points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildRef {
    /// Nothing audio-producing.
    None,
    /// One object.
    Object(ObjectId),
    /// Several objects.
    Objects(Vec<ObjectId>),
    /// One raw node.
    Stream(NodeId),
    /// Several raw nodes.
    Streams(Vec<NodeId>),
}

impl ChildRef {
    /// Child reference carried by an argument.
    pub fn from_arg(arg: &Arg) -> Self {
        match arg {
            Arg::Object(id) => ChildRef::Object(*id),
            Arg::Objects(ids) => ChildRef::Objects(ids.clone()),
            Arg::Streams(ids) if ids.len() == 1 => ChildRef::Stream(ids[0]),
            Arg::Streams(ids) => ChildRef::Streams(ids.clone()),
            Arg::Number(_) | Arg::Numbers(_) | Arg::Table(_) => ChildRef::None,
        }
    }

    /// Objects referenced by this slot.
    pub fn objects(&self) -> &[ObjectId] {
        match self {
            ChildRef::Object(id) => core::slice::from_ref(id),
            ChildRef::Objects(ids) => ids,
            _ => &[],
        }
    }

    /// Raw nodes referenced by this slot.
    pub fn streams(&self) -> &[NodeId] {
        match self {
            ChildRef::Stream(id) => core::slice::from_ref(id),
            ChildRef::Streams(ids) => ids,
            _ => &[],
        }
    }
}

/// A named, role-tagged reference from an object to its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Parameter name.
    pub name: &'static str,
    /// What the parameter does.
    pub role: SlotRole,
    /// The referenced children.
    pub child: ChildRef,
}

/// Internal bookkeeping for an object in the arena.
pub(crate) struct ObjectData {
    pub kind: &'static dyn ObjectKind,
    pub streams: Vec<NodeId>,
    /// Arguments as last set, parallel to `full_specs(kind)`.
    pub args: Vec<Arg>,
    pub in_fader: Option<InputCrossfader>,
    /// Replaces the stop wait for this object only, in seconds.
    pub stop_delay: Option<f32>,
    pub allow_auto_start: bool,
    pub use_wait_time_on_stop: bool,
    /// Set once the object has been bound as another object's `mul`.
    pub is_mul_attribute: bool,
    pub linked: Vec<ObjectId>,
    pub slots: Vec<Slot>,
    pub released: bool,
}

impl ObjectData {
    /// Wait this object applies to its own streams when asked to stop after
    /// `wait` seconds.
    pub fn effective_wait(&self, wait: f32) -> f32 {
        let wait = if self.is_mul_attribute && !self.use_wait_time_on_stop {
            0.0
        } else {
            wait
        };
        self.stop_delay.unwrap_or(wait)
    }

    /// Objects and raw nodes this object's auto-start propagation reaches.
    pub fn children(&self) -> (Vec<ObjectId>, Vec<NodeId>) {
        let mut objects: Vec<ObjectId> = self
            .slots
            .iter()
            .flat_map(|s| s.child.objects().iter().copied())
            .collect();
        objects.extend(self.linked.iter().copied());
        let nodes = self
            .slots
            .iter()
            .flat_map(|s| s.child.streams().iter().copied())
            .collect();
        (objects, nodes)
    }

    fn set_slot(&mut self, name: &'static str, role: SlotRole, child: ChildRef) {
        self.slots.retain(|s| s.name != name);
        if child != ChildRef::None {
            self.slots.push(Slot { name, role, child });
        }
    }
}

fn slot_role(spec: &ParamSpec) -> SlotRole {
    match (spec.kind, spec.name) {
        (ArgKind::Input, _) => SlotRole::Input,
        (_, "mul") => SlotRole::Mul,
        (_, "add") => SlotRole::Add,
        _ => SlotRole::Param,
    }
}

/// An argument resolved against the live arena.
pub(crate) enum Bound {
    Values(Vec<f32>),
    Nodes(Vec<NodeId>),
    Table(Table),
}

impl Bound {
    fn len(&self) -> usize {
        match self {
            Bound::Values(v) => v.len(),
            Bound::Nodes(n) => n.len(),
            Bound::Table(_) => 1,
        }
    }

    /// Node parameter source for stream `i`.
    pub fn param(&self, i: usize) -> Param {
        match self {
            Bound::Values(v) => Param::Const(wrap(v, i).copied().unwrap_or(0.0)),
            Bound::Nodes(n) => wrap(n, i).map_or(Param::Const(0.0), |&id| Param::Signal(id)),
            Bound::Table(_) => Param::Const(0.0),
        }
    }

    fn value(&self, i: usize) -> f32 {
        match self {
            Bound::Values(v) => wrap(v, i).copied().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// Position of `name` among the kind's signal parameters (excluding `mul`/`add`).
fn signal_index(specs: &[ParamSpec], name: &str) -> Option<usize> {
    specs
        .iter()
        .filter(|s| s.kind == ArgKind::Signal && s.name != "mul" && s.name != "add")
        .position(|s| s.name == name)
}

impl Engine {
    /// Construct an object of `kind` from named arguments.
    ///
    /// Omitted parameters take their declared defaults; the stream count is
    /// the longest argument list. Fails with [`EngineError::NotBooted`] before
    /// boot and with [`EngineError::ArgumentType`] when an argument has the
    /// wrong kind; in both cases nothing is added to the engine.
    ///
    /// ```rust
    /// use strand_core::{Arg, Engine, EngineConfig, kernels::Sine};
    ///
    /// let mut engine = Engine::new();
    /// engine.boot(EngineConfig::default()).unwrap();
    /// let osc = engine
    ///     .create(&Sine, &[("freq", Arg::from([440.0, 550.0, 660.0])), ("mul", 0.5.into())])
    ///     .unwrap();
    /// assert_eq!(engine.base_objects(osc).len(), 3);
    /// ```
    pub fn create(
        &mut self,
        kind: &'static dyn ObjectKind,
        args: &[(&str, Arg)],
    ) -> Result<ObjectId, EngineError> {
        let result = self.try_create(kind, args);
        match &result {
            Ok(id) => tracing::debug!(
                object = kind.name(),
                id = id.0,
                streams = self.base_objects(*id).len(),
                "graph_add"
            ),
            Err(err) => tracing::error!(object = kind.name(), %err, "construction failed"),
        }
        result
    }

    fn try_create(
        &mut self,
        kind: &'static dyn ObjectKind,
        args: &[(&str, Arg)],
    ) -> Result<ObjectId, EngineError> {
        self.ensure_booted()?;
        let specs = full_specs(kind);
        if let Some((name, _)) = args
            .iter()
            .find(|(name, _)| !specs.iter().any(|s| s.name == *name))
        {
            return Err(EngineError::unknown_param(kind.name(), *name));
        }

        let mut stored = Vec::with_capacity(specs.len());
        let mut bound = Vec::with_capacity(specs.len());
        for (position, spec) in specs.iter().enumerate() {
            let arg = match args.iter().find(|(n, _)| *n == spec.name) {
                Some((_, arg)) => arg.clone(),
                None => match spec.default {
                    Some(v) => Arg::Number(v),
                    None => {
                        return Err(EngineError::argument_type(
                            kind.name(),
                            position,
                            spec.name,
                            spec.kind,
                            "nothing",
                        ));
                    }
                },
            };
            spec.check(kind.name(), position, &arg)?;
            bound.push(self.bind(spec, &arg)?);
            stored.push(arg);
        }

        let input_pos = specs.iter().position(|s| s.kind == ArgKind::Input);
        let fader_sources = match input_pos.map(|p| &bound[p]) {
            Some(Bound::Nodes(nodes)) => nodes.clone(),
            _ => Vec::new(),
        };
        let stream_count = lmax(bound.iter().map(Bound::len));

        // Every buffer is allocated before the arena is touched.
        let block = self.config.buffer_size;
        let mut buffers = Vec::with_capacity(fader_sources.len() + stream_count);
        for _ in 0..fader_sources.len() + stream_count {
            buffers.push(StreamBuffer::allocate(block)?);
        }
        let mut buffers = buffers.into_iter();

        let id = ObjectId(self.objects.len() as u32);

        let mut fader_nodes = Vec::with_capacity(fader_sources.len());
        for &source in &fader_sources {
            let mut node = NodeData::new(
                self.next_node_id(),
                Some(id),
                NodeBody::Crossfade(Crossfade::new()),
            );
            node.inputs.push(source);
            node.play(0, 0);
            fader_nodes.push(self.insert_node(node, buffers.next().unwrap_or_default()));
        }

        let mut streams = Vec::with_capacity(stream_count);
        for i in 0..stream_count {
            let kernel = self.build_kernel(kind, &specs, &bound, i);
            let mut node = NodeData::new(self.next_node_id(), Some(id), NodeBody::Kernel(kernel));
            for (spec, b) in specs.iter().zip(&bound) {
                match (spec.kind, spec.name) {
                    (ArgKind::Input, _) => node.inputs.extend(wrap(&fader_nodes, i).copied()),
                    (ArgKind::Signal, "mul") => node.mul = b.param(i),
                    (ArgKind::Signal, "add") => node.add = b.param(i),
                    (ArgKind::Signal, _) => node.params.push(b.param(i)),
                    _ => {}
                }
            }
            streams.push(self.insert_node(node, buffers.next().unwrap_or_default()));
        }

        let mut data = ObjectData {
            kind,
            streams,
            args: Vec::new(),
            in_fader: input_pos.map(|_| InputCrossfader {
                nodes: fader_nodes,
            }),
            stop_delay: None,
            allow_auto_start: true,
            use_wait_time_on_stop: false,
            is_mul_attribute: false,
            linked: Vec::new(),
            slots: Vec::new(),
            released: false,
        };
        for (spec, arg) in specs.iter().zip(&stored) {
            data.set_slot(spec.name, slot_role(spec), ChildRef::from_arg(arg));
        }
        data.args = stored;
        let mul_sources: Vec<ObjectId> = data
            .slots
            .iter()
            .filter(|s| s.role == SlotRole::Mul)
            .flat_map(|s| s.child.objects().iter().copied())
            .collect();

        self.objects.push(Some(data));
        self.mark_mul_sources(&mul_sources);
        self.topology_dirty = true;
        Ok(id)
    }

    /// Resolve an argument that already passed its kind check.
    pub(crate) fn bind(&self, spec: &ParamSpec, arg: &Arg) -> Result<Bound, EngineError> {
        Ok(match arg {
            Arg::Number(v) => Bound::Values(vec![*v]),
            Arg::Numbers(v) => Bound::Values(v.clone()),
            Arg::Table(t) => Bound::Table(
                self.table(*t)
                    .cloned()
                    .ok_or(EngineError::UnknownTable(*t))?,
            ),
            Arg::Object(_) | Arg::Objects(_) | Arg::Streams(_) => {
                let nodes = self.signal_nodes(arg)?;
                if spec.kind == ArgKind::Constant {
                    Bound::Values(
                        nodes
                            .iter()
                            .map(|n| self.buffers[n.0 as usize].current_value())
                            .collect(),
                    )
                } else {
                    Bound::Nodes(nodes)
                }
            }
        })
    }

    /// Flatten a signal argument into live node handles.
    pub(crate) fn signal_nodes(&self, arg: &Arg) -> Result<Vec<NodeId>, EngineError> {
        match arg {
            Arg::Object(id) => Ok(self.object(*id)?.streams.clone()),
            Arg::Objects(ids) => {
                let mut nodes = Vec::new();
                for id in ids {
                    nodes.extend_from_slice(&self.object(*id)?.streams);
                }
                Ok(nodes)
            }
            Arg::Streams(ids) => {
                if let Some(missing) = ids.iter().find(|id| self.node(**id).is_none()) {
                    return Err(EngineError::UnknownNode(*missing));
                }
                Ok(ids.clone())
            }
            _ => Ok(Vec::new()),
        }
    }

    fn build_kernel(
        &mut self,
        kind: &dyn ObjectKind,
        specs: &[ParamSpec],
        bound: &[Bound],
        stream: usize,
    ) -> Box<dyn Kernel> {
        let mut init = KernelInit::new(self.config.sample_rate);
        init.stream = stream;
        init.block_size = self.config.buffer_size;
        init.seed = self.rng.u64(..);
        for (spec, b) in specs.iter().zip(bound) {
            match (spec.kind, b) {
                (ArgKind::Constant, _) => init.constants.push((spec.name, b.value(stream))),
                (ArgKind::Table, Bound::Table(t)) => init.tables.push((spec.name, t.clone())),
                _ => {}
            }
        }
        let mut kernel = kind.build(&init);
        kernel.prepare(self.config.sample_rate, self.config.buffer_size);
        kernel
    }

    fn mark_mul_sources(&mut self, sources: &[ObjectId]) {
        for id in sources {
            if let Some(Some(obj)) = self.objects.get_mut(id.0 as usize) {
                obj.is_mul_attribute = true;
            }
        }
    }

    /// Replace a parameter on every stream of `object`.
    ///
    /// The new argument is wrapped across the existing streams; the stream
    /// count never changes. Replacing the `Input` parameter crossfades over the
    /// configured default fade time.
    pub fn set_param(
        &mut self,
        object: ObjectId,
        name: &str,
        value: impl Into<Arg>,
    ) -> Result<(), EngineError> {
        let value = value.into();
        let kind = self.object(object)?.kind;
        let specs = full_specs(kind);
        let (position, spec) = specs
            .iter()
            .enumerate()
            .find(|(_, s)| s.name == name)
            .ok_or_else(|| EngineError::unknown_param(kind.name(), name))?;
        if spec.kind == ArgKind::Input {
            return self.set_input(object, value, self.config.fade_time);
        }
        if let Err(err) = spec.check(kind.name(), position, &value) {
            tracing::error!(object = kind.name(), %err, "set_param rejected");
            return Err(err);
        }
        let bound = self.bind(spec, &value)?;
        let streams = self.object(object)?.streams.clone();

        match spec.kind {
            ArgKind::Signal => {
                let index = signal_index(&specs, spec.name);
                for (i, id) in streams.iter().enumerate() {
                    let Some(node) = self.node_mut(*id) else {
                        continue;
                    };
                    let p = bound.param(i);
                    match (spec.name, index) {
                        ("mul", _) => node.mul = p,
                        ("add", _) => node.add = p,
                        (_, Some(k)) => {
                            if let Some(slot) = node.params.get_mut(k) {
                                *slot = p;
                            }
                        }
                        _ => {}
                    }
                }
                self.topology_dirty = true;
            }
            ArgKind::Constant => {
                let mut rebuild = false;
                for (i, id) in streams.iter().enumerate() {
                    if let Some(NodeData {
                        body: NodeBody::Kernel(kernel),
                        ..
                    }) = self.node_mut(*id)
                    {
                        rebuild |= !kernel.set_constant(spec.name, bound.value(i));
                    }
                }
                if rebuild {
                    self.store_arg(object, position, spec, &value);
                    self.rebuild_kernels(object)?;
                }
            }
            ArgKind::Table => {
                self.store_arg(object, position, spec, &value);
                self.rebuild_kernels(object)?;
            }
            ArgKind::Input => {}
        }

        self.store_arg(object, position, spec, &value);
        if spec.name == "mul" {
            self.mark_mul_sources(ChildRef::from_arg(&value).objects());
        }
        tracing::debug!(id = object.0, param = spec.name, "graph_set_param");
        self.refresh_observers(object);
        Ok(())
    }

    /// Set the amplitude source (number, list, or signal) of every stream.
    pub fn set_mul(&mut self, object: ObjectId, value: impl Into<Arg>) -> Result<(), EngineError> {
        self.set_param(object, "mul", value)
    }

    /// Set the offset source (number, list, or signal) of every stream.
    pub fn set_add(&mut self, object: ObjectId, value: impl Into<Arg>) -> Result<(), EngineError> {
        self.set_param(object, "add", value)
    }

    pub(crate) fn store_arg(&mut self, object: ObjectId, position: usize, spec: &ParamSpec, value: &Arg) {
        if let Some(Some(obj)) = self.objects.get_mut(object.0 as usize) {
            if let Some(slot) = obj.args.get_mut(position) {
                slot.clone_from(value);
            }
            obj.set_slot(spec.name, slot_role(spec), ChildRef::from_arg(value));
        }
    }

    /// Rebuild every stream's kernel from the stored arguments.
    fn rebuild_kernels(&mut self, object: ObjectId) -> Result<(), EngineError> {
        let obj = self.object(object)?;
        let kind = obj.kind;
        let specs = full_specs(kind);
        let streams = obj.streams.clone();
        let args = obj.args.clone();
        let mut bound = Vec::with_capacity(specs.len());
        for (spec, arg) in specs.iter().zip(&args) {
            bound.push(match spec.kind {
                ArgKind::Constant | ArgKind::Table => self.bind(spec, arg)?,
                _ => Bound::Values(Vec::new()),
            });
        }
        for (i, id) in streams.iter().enumerate() {
            let kernel = self.build_kernel(kind, &specs, &bound, i);
            if let Some(node) = self.node_mut(*id) {
                node.body = NodeBody::Kernel(kernel);
            }
        }
        Ok(())
    }

    /// The object's streams, in order. Empty for a dead handle.
    pub fn base_objects(&self, object: ObjectId) -> Vec<NodeId> {
        self.object(object)
            .map(|o| o.streams.clone())
            .unwrap_or_default()
    }

    /// Number of streams the object was built with.
    pub fn stream_count(&self, object: ObjectId) -> usize {
        self.object(object).map_or(0, |o| o.streams.len())
    }

    /// Stream `index` of `object`.
    ///
    /// An out-of-range index is logged and yields `None`.
    pub fn stream(&self, object: ObjectId, index: usize) -> Option<NodeId> {
        let streams = &self.object(object).ok()?.streams;
        let found = streams.get(index).copied();
        if found.is_none() {
            tracing::warn!(
                id = object.0,
                index,
                count = streams.len(),
                "stream index out of range"
            );
        }
        found
    }

    /// The object held in the child slot called `name`.
    ///
    /// A missing slot, or one that does not hold exactly one object, is logged
    /// and yields `None`.
    pub fn sub_object(&self, object: ObjectId, name: &str) -> Option<ObjectId> {
        let obj = self.object(object).ok()?;
        let found = obj.slots.iter().find(|s| s.name == name).and_then(|s| match s.child {
            ChildRef::Object(id) => Some(id),
            _ => None,
        });
        if found.is_none() {
            tracing::warn!(object = obj.kind.name(), slot = name, "no such sub-object");
        }
        found
    }

    /// The argument last given for parameter `name`.
    pub fn arg(&self, object: ObjectId, name: &str) -> Option<&Arg> {
        let obj = self.object(object).ok()?;
        let position = obj.kind.params().iter().chain(MUL_ADD.iter()).position(|s| s.name == name)?;
        obj.args.get(position)
    }

    /// The source a stream reads signal parameter `name` from, including
    /// `mul` and `add`.
    pub fn stream_param(&self, stream: NodeId, name: &str) -> Option<Param> {
        let node = self.node(stream)?;
        match name {
            "mul" => Some(node.mul),
            "add" => Some(node.add),
            _ => {
                let owner = self.objects.get(node.owner?.0 as usize)?.as_ref()?;
                let index = signal_index(&full_specs(owner.kind), name)?;
                node.params.get(index).copied()
            }
        }
    }

    /// Child slots declared by the object.
    pub fn slots(&self, object: ObjectId) -> &[Slot] {
        self.object(object)
            .map(|o| o.slots.as_slice())
            .unwrap_or_default()
    }

    /// Kind name of the object.
    pub fn kind_name(&self, object: ObjectId) -> Option<&'static str> {
        self.object(object).ok().map(|o| o.kind.name())
    }

    /// Override the stop wait for this object. `None` restores caller waits.
    pub fn set_stop_delay(&mut self, object: ObjectId, seconds: Option<f32>) -> Result<(), EngineError> {
        self.object_mut(object)?.stop_delay = seconds;
        Ok(())
    }

    /// Whether auto-start propagation may start and stop this object.
    pub fn set_allow_auto_start(&mut self, object: ObjectId, allow: bool) -> Result<(), EngineError> {
        self.object_mut(object)?.allow_auto_start = allow;
        Ok(())
    }

    /// Let a `mul` source honour stop waits instead of stopping at once.
    pub fn set_use_wait_time_on_stop(&mut self, object: ObjectId, value: bool) -> Result<(), EngineError> {
        self.object_mut(object)?.use_wait_time_on_stop = value;
        Ok(())
    }

    /// Returns true once the object has been bound as another object's `mul`.
    pub fn is_mul_attribute(&self, object: ObjectId) -> bool {
        self.object(object).is_ok_and(|o| o.is_mul_attribute)
    }

    /// Tie `other`'s lifecycle to `object`: it is kept alive and auto-started
    /// with it even though no parameter references it.
    pub fn link(&mut self, object: ObjectId, other: ObjectId) -> Result<(), EngineError> {
        self.object(other)?;
        let obj = self.object_mut(object)?;
        if !obj.linked.contains(&other) {
            obj.linked.push(other);
        }
        Ok(())
    }

    /// Drop the caller's handle to `object`.
    ///
    /// The object and its nodes are freed at the next tick boundary unless a
    /// live object or node still references them.
    pub fn release(&mut self, object: ObjectId) -> Result<(), EngineError> {
        self.object_mut(object)?.released = true;
        self.sweep_pending = true;
        tracing::debug!(id = object.0, "graph_release");
        Ok(())
    }

    /// Returns true if any stream is scheduled.
    pub fn is_playing(&self, object: ObjectId) -> bool {
        self.object(object)
            .is_ok_and(|o| o.streams.iter().any(|id| self.node(*id).is_some_and(NodeData::is_playing)))
    }

    /// Returns true if any stream is routed to a physical output.
    pub fn is_outputting(&self, object: ObjectId) -> bool {
        self.object(object).is_ok_and(|o| {
            o.streams
                .iter()
                .any(|id| self.node(*id).is_some_and(NodeData::is_outputting))
        })
    }

    /// Last sample of every stream's most recent block.
    pub fn current_values(&self, object: ObjectId) -> Vec<f32> {
        self.base_objects(object)
            .iter()
            .map(|id| self.buffers[id.0 as usize].current_value())
            .collect()
    }

    /// Physical channel of every stream, `None` where not outputting.
    pub fn out_channels(&self, object: ObjectId) -> Vec<Option<usize>> {
        self.base_objects(object)
            .iter()
            .map(|id| {
                self.node(*id)
                    .filter(|n| n.is_outputting())
                    .and_then(|n| n.out_channel)
            })
            .collect()
    }

    /// Externally visible state of a node.
    pub fn view(&self, stream: NodeId) -> Option<NodeView> {
        let node = self.node(stream)?;
        Some(NodeView {
            is_playing: node.is_playing(),
            is_outputting: node.is_outputting(),
            current_value: self.buffers[stream.0 as usize].current_value(),
            state: node.state,
        })
    }

    /// Output block of a node from the most recent tick.
    pub fn stream_buffer(&self, stream: NodeId) -> Option<&[f32]> {
        self.node(stream)?;
        Some(self.buffers[stream.0 as usize].read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::kernels::{Sig, Sine, TableRead, Tone};

    fn booted() -> Engine {
        let mut engine = Engine::new();
        engine
            .boot(EngineConfig {
                sample_rate: 44100.0,
                buffer_size: 256,
                ..EngineConfig::default()
            })
            .unwrap();
        engine
    }

    #[test]
    fn list_expansion_sets_stream_count_and_broadcasts_mul() {
        let mut engine = booted();
        let osc = engine
            .create(&Sine, &[("freq", Arg::from([440.0, 550.0, 660.0])), ("mul", 0.5.into())])
            .unwrap();
        let streams = engine.base_objects(osc);
        assert_eq!(streams.len(), 3);
        for s in &streams {
            assert_eq!(engine.stream_param(*s, "mul"), Some(Param::Const(0.5)));
        }
        assert_eq!(engine.stream_param(streams[2], "freq"), Some(Param::Const(660.0)));
        assert_eq!(engine.arg(osc, "mul"), Some(&Arg::Number(0.5)));
    }

    #[test]
    fn shorter_lists_wrap() {
        let mut engine = booted();
        let osc = engine
            .create(
                &Sine,
                &[("freq", Arg::from([100.0, 200.0, 300.0, 400.0])), ("mul", Arg::from([0.1, 0.2]))],
            )
            .unwrap();
        let streams = engine.base_objects(osc);
        assert_eq!(engine.stream_param(streams[2], "mul"), Some(Param::Const(0.1)));
        assert_eq!(engine.stream_param(streams[3], "mul"), Some(Param::Const(0.2)));
    }

    #[test]
    fn object_argument_contributes_its_stream_count() {
        let mut engine = booted();
        let src = engine.create(&Sine, &[("freq", Arg::from([1.0, 2.0]))]).unwrap();
        let lp = engine.create(&Tone, &[("input", src.into())]).unwrap();
        assert_eq!(engine.stream_count(lp), 2);
        assert_eq!(engine.sub_object(lp, "input"), Some(src));
    }

    #[test]
    fn construction_before_boot_fails_and_leaves_nothing() {
        let mut engine = Engine::new();
        let err = engine.create(&Sine, &[]).unwrap_err();
        assert!(matches!(err, EngineError::NotBooted));
        assert_eq!(engine.object_count(), 0);
        assert_eq!(engine.node_count(), 0);
    }

    #[test]
    fn wrong_kind_fails_without_allocating() {
        let mut engine = booted();
        let err = engine.create(&Tone, &[("input", 1.0.into())]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ArgumentType {
                position: 0,
                name: "input",
                ..
            }
        ));
        assert_eq!(engine.node_count(), 0);
        assert_eq!(engine.object_count(), 0);
    }

    #[test]
    fn missing_required_argument_is_reported() {
        let mut engine = booted();
        let err = engine.create(&TableRead, &[]).unwrap_err();
        assert!(matches!(err, EngineError::ArgumentType { actual: "nothing", .. }));
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let mut engine = booted();
        let err = engine.create(&Sine, &[("cutoff", 1.0.into())]).unwrap_err();
        assert!(matches!(err, EngineError::UnknownParam { .. }));
    }

    #[test]
    fn stream_index_out_of_range_is_none() {
        let mut engine = booted();
        let osc = engine.create(&Sine, &[]).unwrap();
        assert!(engine.stream(osc, 0).is_some());
        assert_eq!(engine.stream(osc, 5), None);
        assert_eq!(engine.sub_object(osc, "freq"), None);
        assert_eq!(engine.sub_object(osc, "nope"), None);
    }

    #[test]
    fn mul_object_is_flagged_and_slotted() {
        let mut engine = booted();
        let lfo = engine.create(&Sine, &[("freq", 2.0.into())]).unwrap();
        let osc = engine.create(&Sine, &[("mul", lfo.into())]).unwrap();
        assert!(engine.is_mul_attribute(lfo));
        assert!(!engine.is_mul_attribute(osc));
        let slot = engine.slots(osc).iter().find(|s| s.name == "mul").unwrap();
        assert_eq!(slot.role, SlotRole::Mul);
        let stream = engine.stream(osc, 0).unwrap();
        assert_eq!(
            engine.stream_param(stream, "mul"),
            Some(Param::Signal(engine.stream(lfo, 0).unwrap()))
        );
    }

    #[test]
    fn set_param_updates_streams_without_resizing() {
        let mut engine = booted();
        let osc = engine.create(&Sine, &[("freq", Arg::from([1.0, 2.0, 3.0]))]).unwrap();
        engine.set_param(osc, "freq", Arg::from([10.0, 20.0, 30.0, 40.0, 50.0])).unwrap();
        let streams = engine.base_objects(osc);
        assert_eq!(streams.len(), 3);
        assert_eq!(engine.stream_param(streams[1], "freq"), Some(Param::Const(20.0)));
        engine.set_mul(osc, 0.25).unwrap();
        assert_eq!(engine.stream_param(streams[0], "mul"), Some(Param::Const(0.25)));
    }

    #[test]
    fn set_param_rejects_wrong_kind() {
        let mut engine = booted();
        let table = engine.add_table(Table::sine(64, 44100.0)).unwrap();
        let osc = engine.create(&Sig, &[]).unwrap();
        assert!(engine.set_param(osc, "value", table).is_err());
        assert!(engine.set_param(osc, "nope", 1.0).is_err());
    }

    #[test]
    fn effective_wait_policies() {
        let mut engine = booted();
        let osc = engine.create(&Sine, &[]).unwrap();
        let obj = engine.object_mut(osc).unwrap();
        assert_eq!(obj.effective_wait(2.0), 2.0);
        obj.is_mul_attribute = true;
        assert_eq!(obj.effective_wait(2.0), 0.0);
        obj.use_wait_time_on_stop = true;
        assert_eq!(obj.effective_wait(2.0), 2.0);
        obj.stop_delay = Some(0.5);
        assert_eq!(obj.effective_wait(2.0), 0.5);
    }

    #[test]
    fn child_ref_from_args() {
        assert_eq!(ChildRef::from_arg(&Arg::Number(1.0)), ChildRef::None);
        assert_eq!(ChildRef::from_arg(&Arg::Streams(vec![NodeId(1)])), ChildRef::Stream(NodeId(1)));
        let r = ChildRef::from_arg(&Arg::Objects(vec![ObjectId(1), ObjectId(2)]));
        assert_eq!(r.objects(), &[ObjectId(1), ObjectId(2)]);
        assert!(r.streams().is_empty());
    }
}
