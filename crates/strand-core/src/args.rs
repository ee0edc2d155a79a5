//! Constructor arguments and list expansion.
//!
//! Object arguments are a closed set of tagged variants ([`Arg`]). Each object
//! kind declares its parameters as [`ParamSpec`]s carrying an [`ArgKind`]
//! capability tag; arguments are checked against those tags exactly once, when
//! the object is built or a parameter is replaced.
//!
//! # List expansion
//!
//! Every argument is treated as a list: scalars become one-element lists and an
//! object reference contributes one entry per stream. The object gets
//! [`lmax`] streams, and stream `i` reads [`wrap`]`(arg, i)` from every
//! argument, so shorter lists cycle instead of padding.
//!
//! ```rust
//! use strand_core::args::{lmax, wrap};
//!
//! let freqs = [440.0, 550.0, 660.0];
//! let amps = [0.5];
//! assert_eq!(lmax([freqs.len(), amps.len()]), 3);
//! assert_eq!(wrap(&amps, 2), Some(&0.5));
//! assert_eq!(wrap(&freqs, 4), Some(&550.0));
//! ```

use crate::error::EngineError;
use crate::node::NodeId;
use crate::object::ObjectId;
use crate::table::TableId;

/// A constructor or setter argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A single number.
    Number(f32),
    /// A list of numbers, one per stream (wrapped).
    Numbers(Vec<f32>),
    /// Every stream of another object.
    Object(ObjectId),
    /// The streams of several objects, flattened in order.
    Objects(Vec<ObjectId>),
    /// Raw nodes, bypassing their owning objects.
    Streams(Vec<NodeId>),
    /// A sample table.
    Table(TableId),
}

impl Arg {
    /// Short description of the variant, used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Arg::Number(_) => "number",
            Arg::Numbers(v) if v.is_empty() => "empty list",
            Arg::Numbers(_) => "number list",
            Arg::Object(_) => "object",
            Arg::Objects(v) if v.is_empty() => "empty list",
            Arg::Objects(_) => "object list",
            Arg::Streams(v) if v.is_empty() => "empty list",
            Arg::Streams(_) => "stream list",
            Arg::Table(_) => "table",
        }
    }

    /// Returns true for variants that carry audio signals.
    pub fn is_signal(&self) -> bool {
        matches!(self, Arg::Object(_) | Arg::Objects(_) | Arg::Streams(_))
    }

    fn is_empty_list(&self) -> bool {
        match self {
            Arg::Numbers(v) => v.is_empty(),
            Arg::Objects(v) => v.is_empty(),
            Arg::Streams(v) => v.is_empty(),
            _ => false,
        }
    }
}

impl From<f32> for Arg {
    fn from(v: f32) -> Self {
        Arg::Number(v)
    }
}

impl From<Vec<f32>> for Arg {
    fn from(v: Vec<f32>) -> Self {
        Arg::Numbers(v)
    }
}

impl From<&[f32]> for Arg {
    fn from(v: &[f32]) -> Self {
        Arg::Numbers(v.to_vec())
    }
}

impl<const N: usize> From<[f32; N]> for Arg {
    fn from(v: [f32; N]) -> Self {
        Arg::Numbers(v.to_vec())
    }
}

impl From<ObjectId> for Arg {
    fn from(id: ObjectId) -> Self {
        Arg::Object(id)
    }
}

impl From<Vec<ObjectId>> for Arg {
    fn from(ids: Vec<ObjectId>) -> Self {
        Arg::Objects(ids)
    }
}

impl From<NodeId> for Arg {
    fn from(id: NodeId) -> Self {
        Arg::Streams(vec![id])
    }
}

impl From<Vec<NodeId>> for Arg {
    fn from(ids: Vec<NodeId>) -> Self {
        Arg::Streams(ids)
    }
}

impl From<TableId> for Arg {
    fn from(id: TableId) -> Self {
        Arg::Table(id)
    }
}

/// Capability a parameter position requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// A number or an audio signal, read per sample.
    Signal,
    /// A number. Signals are accepted and read as their current value.
    Constant,
    /// An audio signal, routed through the object's input crossfader.
    Input,
    /// A sample table.
    Table,
}

impl core::fmt::Display for ArgKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ArgKind::Signal => "number or signal",
            ArgKind::Constant => "number",
            ArgKind::Input => "audio input",
            ArgKind::Table => "table",
        })
    }
}

/// Declared parameter of an object kind.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: &'static str,
    /// Accepted argument capability.
    pub kind: ArgKind,
    /// Value used when the argument is omitted; `None` means required.
    pub default: Option<f32>,
}

impl ParamSpec {
    /// A per-sample parameter with a default.
    pub const fn signal(name: &'static str, default: f32) -> Self {
        Self {
            name,
            kind: ArgKind::Signal,
            default: Some(default),
        }
    }

    /// A construction-time number with a default.
    pub const fn constant(name: &'static str, default: f32) -> Self {
        Self {
            name,
            kind: ArgKind::Constant,
            default: Some(default),
        }
    }

    /// A required audio input.
    pub const fn input(name: &'static str) -> Self {
        Self {
            name,
            kind: ArgKind::Input,
            default: None,
        }
    }

    /// A required table.
    pub const fn table(name: &'static str) -> Self {
        Self {
            name,
            kind: ArgKind::Table,
            default: None,
        }
    }

    /// Checks that `arg` has a capability this parameter accepts.
    pub fn check(
        &self,
        object: &'static str,
        position: usize,
        arg: &Arg,
    ) -> Result<(), EngineError> {
        let accepted = !arg.is_empty_list()
            && match self.kind {
                ArgKind::Signal | ArgKind::Constant => {
                    matches!(arg, Arg::Number(_) | Arg::Numbers(_)) || arg.is_signal()
                }
                ArgKind::Input => arg.is_signal(),
                ArgKind::Table => matches!(arg, Arg::Table(_)),
            };
        if accepted {
            Ok(())
        } else {
            Err(EngineError::argument_type(
                object,
                position,
                self.name,
                self.kind,
                arg.describe(),
            ))
        }
    }
}

/// Element `i` of `list`, cycling when `i` is past the end.
///
/// Returns `None` only for an empty list.
#[inline]
pub fn wrap<T>(list: &[T], i: usize) -> Option<&T> {
    if list.is_empty() {
        None
    } else {
        list.get(i % list.len())
    }
}

/// Stream count produced by arguments of the given list lengths.
///
/// At least one stream is always produced.
pub fn lmax(lens: impl IntoIterator<Item = usize>) -> usize {
    lens.into_iter().max().unwrap_or(1).max(1)
}
