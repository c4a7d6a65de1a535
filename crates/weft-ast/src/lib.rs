//! Weft AST - Core types for the abstract syntax tree
//!
//! This crate defines the node variants for declarations, statements,
//! expressions, and type specifications, plus source locations for
//! diagnostics. The tree is an immutable, acyclic forest owned by the
//! compilation unit that parsed it; downstream passes only read it.

mod loc;
mod types;
mod expr;
mod stmt;
mod decl;

pub use loc::*;
pub use types::*;
pub use expr::*;
pub use stmt::*;
pub use decl::*;

use serde::{Deserialize, Serialize};

/// A complete Weft program
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    /// Component type declarations
    pub components: Vec<ComponentDecl>,
    /// Free-standing function declarations
    pub functions: Vec<BehaviorDecl>,
}

impl Program {
    pub fn new(components: Vec<ComponentDecl>, functions: Vec<BehaviorDecl>) -> Self {
        Self {
            components,
            functions,
        }
    }
}
