//! Declaration AST nodes

use crate::{Block, Expr, Loc, TypeSpec};
use serde::{Deserialize, Serialize};

/// A component type declaration: `component Counter { ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDecl {
    pub name: String,
    pub members: Vec<MemberDecl>,
    pub loc: Loc,
}

/// A member of a component declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDecl {
    pub kind: MemberKind,
    pub loc: Loc,
}

impl MemberDecl {
    pub fn new(kind: MemberKind, loc: Loc) -> Self {
        Self { kind, loc }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MemberKind {
    /// State field: `var level: Int`
    Field(FieldDecl),

    /// Constant: `const LIMIT = 8`
    Const(ConstDecl),

    /// Construction-time behavior
    Initializer(BehaviorDecl),

    /// Read-only query behavior
    Getter(BehaviorDecl),

    /// Ordinary method; imposes no context of its own
    Method(BehaviorDecl),

    /// Autonomous behavior guarded by a precondition
    Action(ActionDecl),

    /// Behavior invoked through a bound push port
    Reaction(ReactionDecl),

    /// Output connection point
    PushPort(PortDecl),

    /// Input connection point, read through a bound getter
    PullPort(PortDecl),

    /// Port wiring between instances
    Bind(BindDecl),

    /// Nested component instance: `cell: Counter`
    Instance(InstanceDecl),
}

/// State field declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeSpec,
    pub loc: Loc,
}

/// Constant declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstDecl {
    pub name: String,
    pub value: Expr,
    pub loc: Loc,
}

/// Body-carrying member: initializer, getter, or method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub loc: Loc,
}

impl BehaviorDecl {
    pub fn new(name: impl Into<String>, body: Block, loc: Loc) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            body,
            loc,
        }
    }
}

/// Behavior parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeSpec,
    pub loc: Loc,
}

/// Action declaration, optionally replicated over an iota index range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDecl {
    pub name: String,
    /// `Some` for dimensioned actions: one independent replica per index
    pub iota: Option<IotaSpec>,
    pub precondition: Expr,
    pub body: Block,
    pub loc: Loc,
}

/// Reaction declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub iota: Option<IotaSpec>,
    pub body: Block,
    pub loc: Loc,
}

/// Replication dimension of an action or reaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IotaSpec {
    pub name: String,
    pub extent: Expr,
    pub loc: Loc,
}

/// Port declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDecl {
    pub name: String,
    pub ty: TypeSpec,
    pub loc: Loc,
}

/// Port wiring declared by the enclosing component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindDecl {
    pub kind: BindKind,
    pub loc: Loc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BindKind {
    /// Push edge: source instance's output port fires a reaction on the
    /// target instance, tagged with an integer parameter
    Push {
        source: String,
        port: String,
        target: String,
        reaction: String,
        parameter: i64,
    },

    /// Pull edge: the port reads a getter on the target instance on demand
    Pull {
        source: String,
        port: String,
        target: String,
        getter: String,
    },
}

/// Nested instance declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDecl {
    pub name: String,
    pub component: String,
    pub loc: Loc,
}
