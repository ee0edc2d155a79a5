//! Cross-thread control of a running engine.
//!
//! The engine is single-threaded: only the thread that owns it ticks it. Other
//! threads (a UI, a network listener) hold a cloneable [`Controller`] and queue
//! [`Command`]s, which the engine applies at the start of its next tick.
//! Commands that fail there are logged and dropped.

use crossbeam_channel::Sender;

use crate::args::Arg;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::object::ObjectId;

/// A deferred engine operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// [`Engine::play`].
    Play {
        /// Target object.
        object: ObjectId,
        /// Seconds, 0 = until stopped.
        duration: f32,
        /// Seconds before starting.
        delay: f32,
    },
    /// [`Engine::out`].
    Out {
        /// Target object.
        object: ObjectId,
        /// First channel, negative to scramble.
        channel: i32,
        /// Channel step between streams.
        increment: usize,
        /// Seconds, 0 = until stopped.
        duration: f32,
        /// Seconds before starting.
        delay: f32,
    },
    /// [`Engine::stop`].
    Stop {
        /// Target object.
        object: ObjectId,
        /// Seconds before stopping.
        wait: f32,
    },
    /// [`Engine::set_param`].
    SetParam {
        /// Target object.
        object: ObjectId,
        /// Parameter name.
        name: String,
        /// New value.
        value: Arg,
    },
    /// [`Engine::set_input`].
    SetInput {
        /// Target object.
        object: ObjectId,
        /// New input.
        input: Arg,
        /// Crossfade seconds.
        fadetime: f32,
    },
    /// [`Engine::release`].
    Release {
        /// Target object.
        object: ObjectId,
    },
}

/// Cloneable, `Send` handle that queues commands for an [`Engine`].
#[derive(Debug, Clone)]
pub struct Controller {
    tx: Sender<Command>,
}

impl Controller {
    pub(crate) fn new(tx: Sender<Command>) -> Self {
        Self { tx }
    }

    /// Queue a command.
    ///
    /// # Errors
    ///
    /// [`EngineError::ChannelClosed`] once the engine has been dropped.
    pub fn send(&self, command: Command) -> Result<(), EngineError> {
        self.tx.send(command).map_err(|_| EngineError::ChannelClosed)
    }

    /// Queue [`Engine::play`].
    pub fn play(&self, object: ObjectId, duration: f32, delay: f32) -> Result<(), EngineError> {
        self.send(Command::Play {
            object,
            duration,
            delay,
        })
    }

    /// Queue [`Engine::out`] on consecutive channels from `channel`.
    pub fn out(&self, object: ObjectId, channel: i32) -> Result<(), EngineError> {
        self.send(Command::Out {
            object,
            channel,
            increment: 1,
            duration: 0.0,
            delay: 0.0,
        })
    }

    /// Queue [`Engine::stop`].
    pub fn stop(&self, object: ObjectId, wait: f32) -> Result<(), EngineError> {
        self.send(Command::Stop { object, wait })
    }

    /// Queue [`Engine::set_param`].
    pub fn set_param(
        &self,
        object: ObjectId,
        name: impl Into<String>,
        value: impl Into<Arg>,
    ) -> Result<(), EngineError> {
        self.send(Command::SetParam {
            object,
            name: name.into(),
            value: value.into(),
        })
    }

    /// Queue [`Engine::set_input`].
    pub fn set_input(
        &self,
        object: ObjectId,
        input: impl Into<Arg>,
        fadetime: f32,
    ) -> Result<(), EngineError> {
        self.send(Command::SetInput {
            object,
            input: input.into(),
            fadetime,
        })
    }

    /// Queue [`Engine::release`].
    pub fn release(&self, object: ObjectId) -> Result<(), EngineError> {
        self.send(Command::Release { object })
    }
}

impl Engine {
    /// Apply a command immediately.
    pub fn apply(&mut self, command: Command) -> Result<(), EngineError> {
        match command {
            Command::Play {
                object,
                duration,
                delay,
            } => self.play(object, duration, delay),
            Command::Out {
                object,
                channel,
                increment,
                duration,
                delay,
            } => self.out(object, channel, increment, duration, delay),
            Command::Stop { object, wait } => self.stop(object, wait),
            Command::SetParam {
                object,
                name,
                value,
            } => self.set_param(object, &name, value),
            Command::SetInput {
                object,
                input,
                fadetime,
            } => self.set_input(object, input, fadetime),
            Command::Release { object } => self.release(object),
        }
    }
}
