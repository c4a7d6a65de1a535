//! Runtime error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur while scheduling or evaluating behaviors
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown component type id {0}")]
    UnknownType(u32),

    #[error("unknown instance id {0}")]
    UnknownInstance(u32),

    #[error("action index {index} out of range for component `{component}`")]
    UnknownAction { component: String, index: u32 },

    #[error("reaction index {index} out of range for component `{component}`")]
    UnknownReaction { component: String, index: u32 },

    #[error("getter index {index} out of range for component `{component}`")]
    UnknownGetter { component: String, index: u32 },

    #[error("port index {index} out of range for component `{component}`")]
    UnknownPort { component: String, index: u32 },

    #[error("iota index {iota} out of range for action `{action}`")]
    IotaOutOfRange { action: String, iota: u32 },

    #[error("pull port `{port}` on instance `{instance}` is not bound")]
    UnboundPullPort { instance: String, port: String },

    #[error("instance `{0}` used before initialization")]
    InstanceNotInitialized(String),

    #[error("value stack underflow")]
    StackUnderflow,

    #[error("field store outside a mutable phase")]
    StoreOutsideMutablePhase,

    #[error("precondition attempted a side effect")]
    PreconditionSideEffect,

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("field slot {slot} out of range")]
    FieldOutOfRange { slot: u32 },

    #[error("pull binding from `{from}` to `{target}` would close a cycle")]
    PullBindingCycle { from: String, target: String },

    #[error("output write failed: {0}")]
    Output(String),

    /// An invariant break inside the runtime itself; a bug, not a program error
    #[error("internal runtime error: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// Stable code for machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::UnknownType(_) => "E-RT-001",
            RuntimeError::UnknownInstance(_) => "E-RT-002",
            RuntimeError::UnknownAction { .. } => "E-RT-003",
            RuntimeError::UnknownReaction { .. } => "E-RT-004",
            RuntimeError::UnknownGetter { .. } => "E-RT-005",
            RuntimeError::UnknownPort { .. } => "E-RT-006",
            RuntimeError::IotaOutOfRange { .. } => "E-RT-007",
            RuntimeError::UnboundPullPort { .. } => "E-RT-008",
            RuntimeError::InstanceNotInitialized(_) => "E-RT-009",
            RuntimeError::StackUnderflow => "E-RT-010",
            RuntimeError::StoreOutsideMutablePhase => "E-RT-011",
            RuntimeError::PreconditionSideEffect => "E-RT-012",
            RuntimeError::TypeMismatch { .. } => "E-RT-013",
            RuntimeError::DivisionByZero => "E-RT-014",
            RuntimeError::FieldOutOfRange { .. } => "E-RT-015",
            RuntimeError::Output(_) => "E-RT-016",
            RuntimeError::PullBindingCycle { .. } => "E-RT-017",
            RuntimeError::Internal(_) => "E-RT-999",
        }
    }
}
