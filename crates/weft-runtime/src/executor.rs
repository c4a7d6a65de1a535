//! The executor resource model
//!
//! One executor per concurrent worker. It owns the value stack and local
//! frame used by body evaluation, tracks the current instance and the
//! mutable-phase base pointer, and holds shared handles to the work queue
//! and the serialized output stream. The scheduler mutates the current
//! instance immediately before dispatching a body; the body only reads it.

use crate::{InstanceId, Result, RuntimeError, Value, WorkItem, WorkQueue};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Serialized output stream
///
/// Workers contend on this lock directly; acquiring it around a whole
/// statement makes concurrent output interleave at statement granularity
/// rather than by individual characters.
pub struct OutputStream {
    inner: Mutex<Box<dyn Write + Send>>,
}

impl OutputStream {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Write one line under the lock
    pub fn writeln(&self, line: &str) -> Result<()> {
        let mut writer = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{line}").map_err(|e| RuntimeError::Output(e.to_string()))
    }
}

impl std::fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream").finish_non_exhaustive()
    }
}

/// Per-worker execution context
#[derive(Debug)]
pub struct Executor {
    /// Value stack for expression evaluation
    stack: Vec<Value>,
    /// Local-variable frame of the behavior being evaluated
    locals: Vec<Value>,
    /// Parameters of the behavior being evaluated
    params: Vec<Value>,
    /// The instance currently being evaluated
    current: Option<InstanceId>,
    /// Start of the active mutation window on the stack; `None` outside a
    /// mutable phase
    mutable_base: Option<usize>,
    queue: Arc<WorkQueue>,
    output: Arc<OutputStream>,
}

impl Executor {
    pub fn new(queue: Arc<WorkQueue>, output: Arc<OutputStream>) -> Self {
        Self {
            stack: Vec::new(),
            locals: Vec::new(),
            params: Vec::new(),
            current: None,
            mutable_base: None,
            queue,
            output,
        }
    }

    /// Enqueue an instance for later scheduling instead of dispatching it
    /// synchronously
    pub fn enqueue(&self, item: WorkItem) {
        self.queue.push(item);
    }

    pub fn output(&self) -> &OutputStream {
        &self.output
    }

    pub fn current(&self) -> Option<InstanceId> {
        self.current
    }

    pub fn in_mutable_phase(&self) -> bool {
        self.mutable_base.is_some()
    }

    /// Clear stack, frame, and window; called between evaluations so the
    /// executor can be reused
    pub(crate) fn reset(&mut self, current: Option<InstanceId>) {
        self.stack.clear();
        self.locals.clear();
        self.params.clear();
        self.mutable_base = None;
        self.current = current;
    }

    pub(crate) fn set_current(&mut self, id: Option<InstanceId>) {
        self.current = id;
    }

    pub(crate) fn set_params(&mut self, params: Vec<Value>) {
        self.params = params;
    }

    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self) -> Result<Value> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    pub(crate) fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn truncate_stack(&mut self, len: usize) {
        self.stack.truncate(len);
    }

    pub(crate) fn local(&self, index: u32) -> Result<Value> {
        self.locals
            .get(index as usize)
            .cloned()
            .ok_or_else(|| RuntimeError::Internal(format!("local slot {index} out of range")))
    }

    pub(crate) fn set_local(&mut self, index: u32, value: Value) {
        let index = index as usize;
        if index >= self.locals.len() {
            self.locals.resize(index + 1, Value::Unit);
        }
        self.locals[index] = value;
    }

    pub(crate) fn param(&self, index: u32) -> Result<Value> {
        self.params
            .get(index as usize)
            .cloned()
            .ok_or_else(|| RuntimeError::Internal(format!("parameter {index} out of range")))
    }

    /// Open a mutation window at the current stack height, returning the
    /// previous base so nested windows restore correctly
    pub(crate) fn open_window(&mut self) -> Option<usize> {
        self.mutable_base.replace(self.stack.len())
    }

    pub(crate) fn set_window(&mut self, base: Option<usize>) {
        self.mutable_base = base;
    }

    /// Save frame and window around a nested read-only evaluation (getter
    /// or pull-port resolution), restoring them afterwards
    pub(crate) fn save_frame(&mut self) -> SavedFrame {
        SavedFrame {
            locals: std::mem::take(&mut self.locals),
            params: std::mem::take(&mut self.params),
            mutable_base: self.mutable_base.take(),
            current: self.current,
        }
    }

    pub(crate) fn restore_frame(&mut self, frame: SavedFrame) {
        self.locals = frame.locals;
        self.params = frame.params;
        self.mutable_base = frame.mutable_base;
        self.current = frame.current;
    }
}

/// Saved executor frame for nested evaluations
#[derive(Debug)]
pub(crate) struct SavedFrame {
    locals: Vec<Value>,
    params: Vec<Value>,
    mutable_base: Option<usize>,
    current: Option<InstanceId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> Executor {
        Executor::new(
            Arc::new(WorkQueue::new()),
            Arc::new(OutputStream::new(Box::new(std::io::sink()))),
        )
    }

    #[test]
    fn pop_on_empty_stack_underflows() {
        let mut exec = executor();
        assert!(matches!(exec.pop(), Err(RuntimeError::StackUnderflow)));
    }

    #[test]
    fn window_tracks_stack_base() {
        let mut exec = executor();
        assert!(!exec.in_mutable_phase());
        exec.push(Value::Int(1));
        let prev = exec.open_window();
        assert!(prev.is_none());
        assert!(exec.in_mutable_phase());
        exec.set_window(prev);
        assert!(!exec.in_mutable_phase());
    }

    #[test]
    fn nested_frame_save_restores_window() {
        let mut exec = executor();
        exec.set_local(0, Value::Int(7));
        exec.open_window();
        let frame = exec.save_frame();
        assert!(!exec.in_mutable_phase());
        assert!(exec.local(0).is_err());
        exec.restore_frame(frame);
        assert!(exec.in_mutable_phase());
        assert_eq!(exec.local(0).unwrap(), Value::Int(7));
    }
}
