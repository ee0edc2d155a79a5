//! Error types for engine operations.

use crate::args::ArgKind;
use crate::node::NodeId;
use crate::object::ObjectId;
use crate::table::TableId;
use thiserror::Error;

/// Errors surfaced synchronously by [`Engine`](crate::Engine) operations.
///
/// Construction errors leave nothing behind: no object or node enters the
/// arena when one of these is returned.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An object, node, or table was constructed before the engine was booted.
    #[error("engine is not booted")]
    NotBooted,

    /// `boot` was called on an engine that is already running.
    #[error("engine is already booted")]
    AlreadyBooted,

    /// The requested transition is not valid from the current engine state.
    #[error("invalid engine transition: {0}")]
    InvalidState(&'static str),

    /// A constructor or setter argument has the wrong kind for its position.
    #[error(
        "{object}: argument {position} ('{name}') expects {expected}, got {actual}"
    )]
    ArgumentType {
        /// Name of the object kind being constructed.
        object: &'static str,
        /// Zero-based parameter position.
        position: usize,
        /// Parameter name.
        name: &'static str,
        /// Kind the parameter accepts.
        expected: ArgKind,
        /// Description of what was supplied.
        actual: &'static str,
    },

    /// Sample storage could not be allocated.
    #[error("failed to allocate {requested} samples")]
    ResourceExhausted {
        /// Number of samples requested.
        requested: usize,
    },

    /// A parameter name is not declared by the object kind.
    #[error("{object} has no parameter '{name}'")]
    UnknownParam {
        /// Name of the object kind.
        object: &'static str,
        /// Requested parameter name.
        name: String,
    },

    /// The object handle does not refer to a live object.
    #[error("object {0} not found")]
    UnknownObject(ObjectId),

    /// The node handle does not refer to a live node.
    #[error("node {0} not found")]
    UnknownNode(NodeId),

    /// The table handle does not refer to a live table.
    #[error("table {0} not found")]
    UnknownTable(TableId),

    /// `set_input` was called on an object without an input slot.
    #[error("{0} has no input to replace")]
    NoInputSlot(&'static str),

    /// The engine configuration is unusable.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// The engine behind a [`Controller`](crate::Controller) has been dropped.
    #[error("engine command channel is closed")]
    ChannelClosed,
}

impl EngineError {
    /// Create an argument-kind mismatch error.
    pub fn argument_type(
        object: &'static str,
        position: usize,
        name: &'static str,
        expected: ArgKind,
        actual: &'static str,
    ) -> Self {
        EngineError::ArgumentType {
            object,
            position,
            name,
            expected,
            actual,
        }
    }

    /// Create an unknown-parameter error.
    pub fn unknown_param(object: &'static str, name: impl Into<String>) -> Self {
        EngineError::UnknownParam {
            object,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_type_display_names_position_and_kinds() {
        let err = EngineError::argument_type("Tone", 0, "input", ArgKind::Input, "number");
        assert_eq!(
            err.to_string(),
            "Tone: argument 0 ('input') expects audio input, got number"
        );
    }

    #[test]
    fn unknown_param_display() {
        let err = EngineError::unknown_param("Sine", "cutoff");
        assert_eq!(err.to_string(), "Sine has no parameter 'cutoff'");
    }

    #[test]
    fn resource_exhausted_display() {
        let err = EngineError::ResourceExhausted { requested: 1024 };
        assert_eq!(err.to_string(), "failed to allocate 1024 samples");
    }

    #[test]
    fn handle_errors_display_ids() {
        let err = EngineError::UnknownObject(ObjectId(3));
        assert_eq!(err.to_string(), "object ObjectId(3) not found");
    }
}
