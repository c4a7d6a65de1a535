//! Lowered operations
//!
//! Behavior bodies and preconditions reach the runtime as stack-machine
//! programs produced by the lowering collaborator. The scheduler never
//! interprets AST nodes directly.

use crate::{FieldSlot, PortId, Value};
use serde::{Deserialize, Serialize};
use weft_ast::{BinaryOp, UnaryOp};

/// One lowered operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Op {
    /// Push a constant
    Const(Value),

    /// Push the value of an instance state field
    LoadField(FieldSlot),

    /// Pop a value into an instance state field; mutable phase only
    StoreField(FieldSlot),

    /// Push a local variable
    LoadLocal(u32),

    /// Pop into a local variable, growing the frame as needed
    StoreLocal(u32),

    /// Pop an Int slot index and push the state field at that slot
    LoadFieldAt,

    /// Pop an Int slot index, then the value to store into that slot;
    /// mutable phase only
    StoreFieldAt,

    /// Push a behavior parameter (for reactions: 0 = fired value,
    /// 1 = binding parameter)
    LoadParam(u32),

    /// Push the current iota index as an Int
    LoadIota,

    /// Pop two operands, push the result
    Binary(BinaryOp),

    /// Pop one operand, push the result
    Unary(UnaryOp),

    /// Discard the top of stack
    Pop,

    /// Read a pull port: evaluates the bound getter synchronously and
    /// pushes its result
    PullPort(PortId),

    /// Fire a push port: pops the value to publish and enqueues every bound
    /// reaction; never runs a reaction inline
    Fire(PortId),

    /// Pop a value and write it as one line under the output lock
    Print,

    /// Mutation window: the activated values have already been evaluated by
    /// preceding ops; the nested body runs with the window open
    Activate(Vec<Op>),

    /// Pop a condition and run one arm
    If { then_ops: Vec<Op>, else_ops: Vec<Op> },

    /// Re-evaluate `condition` before each iteration of `body`
    While { condition: Vec<Op>, body: Vec<Op> },

    /// Leave the current behavior early
    Return,
}
