//! Type specification AST nodes

use crate::Loc;
use serde::{Deserialize, Serialize};

/// A type specification as written in source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSpec {
    pub kind: TypeSpecKind,
    pub loc: Loc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeSpecKind {
    /// Named type: `Int`, `Bool`, `Counter`
    Named(String),

    /// Array type: `Int[8]`
    Array {
        element: Box<TypeSpec>,
        length: u32,
    },
}

impl TypeSpec {
    pub fn named(name: impl Into<String>, loc: Loc) -> Self {
        Self {
            kind: TypeSpecKind::Named(name.into()),
            loc,
        }
    }
}
