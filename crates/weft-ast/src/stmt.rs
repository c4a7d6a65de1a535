//! Statement AST nodes

use crate::{Expr, Loc};
use serde::{Deserialize, Serialize};

/// A block of statements
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

impl Block {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }

    /// A block whose only statement is an expression
    pub fn of_expr(expr: Expr) -> Self {
        let loc = expr.loc.clone();
        Self {
            statements: vec![Stmt::new(StmtKind::Expr(expr), loc)],
        }
    }
}

/// A statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: Loc,
}

impl Stmt {
    pub fn new(kind: StmtKind, loc: Loc) -> Self {
        Self { kind, loc }
    }

    pub fn expr(expr: Expr) -> Self {
        let loc = expr.loc.clone();
        Self {
            kind: StmtKind::Expr(expr),
            loc,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StmtKind {
    /// Local binding: `let x = expr`
    Let { name: String, value: Expr },

    /// Assignment: `target := expr`
    Assign { target: Expr, value: Expr },

    /// Expression statement: `foo()`
    Expr(Expr),

    /// Return statement: `return expr`
    Return(Option<Expr>),

    /// Conditional: `if cond { ... } else { ... }`
    If {
        condition: Expr,
        then_branch: Block,
        else_branch: Option<Block>,
    },

    /// Loop: `while cond { ... }`
    While { condition: Expr, body: Block },

    /// Mutation window: `activate (values...) { ... }`
    ///
    /// The value list evaluates before the window opens; only the nested
    /// body executes in the mutable phase.
    Activate { values: Vec<Expr>, body: Block },
}
