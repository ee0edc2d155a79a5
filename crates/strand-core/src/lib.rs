//! Strand Core - audio-graph runtime
//!
//! A block-based engine for building sound from interconnected generator and
//! processor objects, with sample-accurate start/stop scheduling and click-free
//! rewiring while audio runs.
//!
//! # Core Abstractions
//!
//! ## Engine
//!
//! - [`Engine`] - Owns every node, object, and table; runs one block per tick
//! - [`EngineConfig`] - Sample rate, block size, channel count, auto-start mode
//! - [`Controller`] - Cloneable handle that queues [`Command`]s from other threads
//!
//! ## Objects and Streams
//!
//! - [`ObjectKind`] - Declares a kind's parameters and builds one [`Kernel`] per stream
//! - [`Arg`] / [`ArgKind`] / [`ParamSpec`] - Tagged arguments checked once at construction
//! - [`NodeId`] / [`ObjectId`] / [`TableId`] - Handles that never alias after a free
//! - [`StreamBuffer`] - One block of samples, owned by exactly one node
//!
//! Constructor arguments may be lists. An object gets one stream per element
//! of its longest argument list; shorter lists wrap.
//!
//! ## Scheduling
//!
//! Every stream has a [`PlayState`]. Delays, durations, and stop waits are
//! counted in samples and land on the exact sample inside a block. With
//! auto-start enabled, playing an object also plays every object it reads.
//!
//! ## Rewiring
//!
//! Replacing an object's audio input ([`Engine::set_input`]) crossfades
//! linearly from the old source to the new one. Released objects are freed at
//! the next tick boundary once nothing live references them.
//!
//! # Example
//!
//! ```rust
//! use strand_core::{Arg, Engine, EngineConfig, kernels::{Sine, Tone}};
//!
//! let mut engine = Engine::new();
//! engine.boot(EngineConfig { auto_start_children: true, ..EngineConfig::default() })?;
//! engine.start()?;
//!
//! let osc = engine.create(&Sine, &[("freq", Arg::from([220.0, 330.0])), ("mul", 0.2.into())])?;
//! let lp = engine.create(&Tone, &[("input", osc.into()), ("freq", 800.0.into())])?;
//! engine.out(lp, 0, 1, 0.0, 0.0)?;
//!
//! let block = engine.process_tick();
//! assert_eq!(block.len(), 256 * 2);
//! # Ok::<(), strand_core::EngineError>(())
//! ```

pub mod args;
mod autostart;
mod buffer;
mod control;
mod crossfader;
mod engine;
mod error;
mod kernel;
pub mod kernels;
mod node;
mod object;
mod observer;
mod param;
mod table;

pub use args::{Arg, ArgKind, ParamSpec};
pub use buffer::StreamBuffer;
pub use control::{Command, Controller};
pub use engine::{Engine, EngineConfig, EngineState};
pub use error::EngineError;
pub use kernel::{Kernel, ParamSignal};
pub use node::{NodeId, NodeView, PlayState};
pub use object::{ChildRef, KernelInit, ObjectId, ObjectKind, Slot, SlotRole};
pub use observer::{ObserverId, ViewObserver};
pub use param::{LinearRamp, Param};
pub use table::{Table, TableId};
