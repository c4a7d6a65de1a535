//! Expression AST nodes

use crate::Loc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: Loc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    /// Literal value: `42`, `true`, `"ready"`
    Literal(Literal),

    /// Identifier: `x`, `count`
    Ident(String),

    /// Field access: `self.level`, `cell.state`
    Field {
        object: Box<Expr>,
        field: String,
    },

    /// Index access: `buf[i]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },

    /// Unary operation: `!x`, `-y`
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// Binary operation: `a + b`
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Call expression: `foo(a, b)`
    ///
    /// `resolved` is filled in by the type-checking collaborator before the
    /// legality pass runs; a call with `resolved == None` reaching the
    /// legality checker is an internal error, not a user diagnostic.
    Call {
        callee: String,
        args: Vec<Expr>,
        resolved: Option<CalleeKind>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, loc: Loc) -> Self {
        Self { kind, loc }
    }

    /// A resolved call expression
    pub fn call(callee: impl Into<String>, resolved: CalleeKind, loc: Loc) -> Self {
        Self {
            kind: ExprKind::Call {
                callee: callee.into(),
                args: Vec::new(),
                resolved: Some(resolved),
            },
            loc,
        }
    }

    pub fn literal(lit: Literal, loc: Loc) -> Self {
        Self {
            kind: ExprKind::Literal(lit),
            loc,
        }
    }
}

/// A literal value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Unit,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// The resolved kind of a call target
///
/// Every type-checked call carries exactly one of these tags; the legality
/// rules key off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalleeKind {
    Function(FunctionKind),
    Method(MethodKind),
}

/// Kinds of free-standing callables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionKind {
    /// Ordinary function, callable from anywhere
    Function,
    /// Push port: never directly callable, only bound to reactions
    PushPort,
    /// Pull port: read synchronously through a bound getter
    PullPort,
}

/// Kinds of component-attached callables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodKind {
    /// Ordinary method, callable from anywhere
    Method,
    /// Construction-time behavior, callable only from initializers
    Initializer,
    /// Read-only query behavior
    Getter,
    /// Behavior invoked only through a bound push port
    Reaction,
}

impl fmt::Display for CalleeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalleeKind::Function(FunctionKind::Function) => write!(f, "function"),
            CalleeKind::Function(FunctionKind::PushPort) => write!(f, "push port"),
            CalleeKind::Function(FunctionKind::PullPort) => write!(f, "pull port"),
            CalleeKind::Method(MethodKind::Method) => write!(f, "method"),
            CalleeKind::Method(MethodKind::Initializer) => write!(f, "initializer"),
            CalleeKind::Method(MethodKind::Getter) => write!(f, "getter"),
            CalleeKind::Method(MethodKind::Reaction) => write!(f, "reaction"),
        }
    }
}
