//! Legality violations with stable machine-readable codes
//!
//! Each distinct violation keeps its own code so tooling that keys off
//! code strings stays stable across releases.

use crate::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use weft_ast::Loc;

/// A single legality violation
///
/// Violations are accumulated during the pass, never fail-fast; the pass
/// reports overall failure only after the whole tree is visited.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum Violation {
    /// E-CTX-001
    #[error("push port `{name}` cannot be called; push ports only fire through bindings")]
    PushPortCall { name: String, loc: Loc },

    /// E-CTX-002
    #[error("pull port `{name}` cannot be read from {context} context")]
    PullPortContext {
        name: String,
        context: Context,
        loc: Loc,
    },

    /// E-CTX-003
    #[error("pull port `{name}` cannot be read in a mutable section")]
    PullPortInMutableSection { name: String, loc: Loc },

    /// E-CTX-004
    #[error("initializer `{name}` may only be called from an initializer")]
    InitializerOutsideInitializer {
        name: String,
        context: Context,
        loc: Loc,
    },

    /// E-CTX-005
    #[error("getter `{name}` cannot be called from {context} context")]
    GetterContext {
        name: String,
        context: Context,
        loc: Loc,
    },

    /// E-CTX-006
    #[error("cannot call getter `{name}` in a mutable section")]
    GetterInMutableSection { name: String, loc: Loc },

    /// E-CTX-007
    #[error("activate is not allowed in {context} context")]
    ActivateContext { context: Context, loc: Loc },

    /// E-CTX-008
    #[error("activate cannot be nested inside another mutable section")]
    NestedActivate { loc: Loc },

    /// E-CTX-009
    #[error("reaction `{name}` cannot be called; reactions only run through bound ports")]
    ReactionCall { name: String, loc: Loc },
}

impl Violation {
    /// Stable code for machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            Violation::PushPortCall { .. } => "E-CTX-001",
            Violation::PullPortContext { .. } => "E-CTX-002",
            Violation::PullPortInMutableSection { .. } => "E-CTX-003",
            Violation::InitializerOutsideInitializer { .. } => "E-CTX-004",
            Violation::GetterContext { .. } => "E-CTX-005",
            Violation::GetterInMutableSection { .. } => "E-CTX-006",
            Violation::ActivateContext { .. } => "E-CTX-007",
            Violation::NestedActivate { .. } => "E-CTX-008",
            Violation::ReactionCall { .. } => "E-CTX-009",
        }
    }

    /// Source location of the violating node
    pub fn loc(&self) -> &Loc {
        match self {
            Violation::PushPortCall { loc, .. }
            | Violation::PullPortContext { loc, .. }
            | Violation::PullPortInMutableSection { loc, .. }
            | Violation::InitializerOutsideInitializer { loc, .. }
            | Violation::GetterContext { loc, .. }
            | Violation::GetterInMutableSection { loc, .. }
            | Violation::ActivateContext { loc, .. }
            | Violation::NestedActivate { loc, .. }
            | Violation::ReactionCall { loc, .. } => loc,
        }
    }

    /// Render as `code: file:line: message`
    pub fn format_simple(&self) -> String {
        format!("{}: {}: {}", self.code(), self.loc(), self)
    }
}

/// Implementation bugs surfaced by the pass
///
/// These are fatal to the checking pass and are never counted among
/// accumulated program violations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InternalError {
    #[error("call to `{name}` at {loc} reached the legality pass with no resolved callee kind")]
    UnresolvedCallee { name: String, loc: Loc },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let loc = Loc::dummy();
        let all = [
            Violation::PushPortCall {
                name: "p".into(),
                loc: loc.clone(),
            },
            Violation::PullPortContext {
                name: "p".into(),
                context: Context::Other,
                loc: loc.clone(),
            },
            Violation::PullPortInMutableSection {
                name: "p".into(),
                loc: loc.clone(),
            },
            Violation::InitializerOutsideInitializer {
                name: "i".into(),
                context: Context::Getter,
                loc: loc.clone(),
            },
            Violation::GetterContext {
                name: "g".into(),
                context: Context::Other,
                loc: loc.clone(),
            },
            Violation::GetterInMutableSection {
                name: "g".into(),
                loc: loc.clone(),
            },
            Violation::ActivateContext {
                context: Context::Getter,
                loc: loc.clone(),
            },
            Violation::NestedActivate { loc: loc.clone() },
            Violation::ReactionCall {
                name: "r".into(),
                loc,
            },
        ];

        let mut codes: Vec<&str> = all.iter().map(|v| v.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn format_carries_code_and_location() {
        let v = Violation::NestedActivate {
            loc: Loc::new("pump.weft", 14),
        };
        let rendered = v.format_simple();
        assert!(rendered.starts_with("E-CTX-008: pump.weft:14:"));
    }
}
