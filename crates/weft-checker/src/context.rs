//! Lexical context classification for the legality pass

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lexical context a piece of code executes in
///
/// A node's effective context is inherited from its nearest enclosing
/// declaration; it is attached per traversal, never stored on the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Context {
    /// Top level, plain functions and methods
    Other,
    Action,
    Reaction,
    Initializer,
    Getter,
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Context::Other => "ordinary",
            Context::Action => "action",
            Context::Reaction => "reaction",
            Context::Initializer => "initializer",
            Context::Getter => "getter",
        };
        write!(f, "{s}")
    }
}

/// Immutable traversal state threaded down the recursive descent
///
/// Each recursive step constructs a new value rather than mutating shared
/// checker state, so the pass is trivially re-entrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckState {
    pub context: Context,
    /// True only while inside an `activate` body
    pub in_mutable_phase: bool,
}

impl CheckState {
    pub fn top_level() -> Self {
        Self {
            context: Context::Other,
            in_mutable_phase: false,
        }
    }

    /// Fresh context for a declaration body; the mutable-phase flag never
    /// crosses a declaration boundary
    pub fn enter(context: Context) -> Self {
        Self {
            context,
            in_mutable_phase: false,
        }
    }

    pub fn with_mutable_phase(self) -> Self {
        Self {
            in_mutable_phase: true,
            ..self
        }
    }
}
