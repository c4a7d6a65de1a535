//! Stack-machine interpreter for lowered operations
//!
//! Evaluation runs against the executor's stack and frame plus a view of
//! the instance's state block. Preconditions and getters evaluate through
//! a shared view that cannot mutate; bodies get the exclusive borrow taken
//! from the instance lock.

use crate::{
    binary, unary, Executor, FieldSlot, InstanceId, InstanceState, Op, PortId, Registry, Result,
    RuntimeError, Value, WorkItem,
};

/// View of an instance's state block
pub(crate) enum StateRef<'a> {
    Shared(&'a InstanceState),
    Exclusive(&'a mut InstanceState),
}

impl StateRef<'_> {
    fn get(&self, slot: FieldSlot) -> Result<Value> {
        let fields = match self {
            StateRef::Shared(s) => &s.fields,
            StateRef::Exclusive(s) => &s.fields,
        };
        fields
            .get(slot.0 as usize)
            .cloned()
            .ok_or(RuntimeError::FieldOutOfRange { slot: slot.0 })
    }

    fn set(&mut self, slot: FieldSlot, value: Value) -> Result<()> {
        match self {
            StateRef::Shared(_) => Err(RuntimeError::Internal(
                "store through a shared state view".to_string(),
            )),
            StateRef::Exclusive(s) => {
                let field = s
                    .fields
                    .get_mut(slot.0 as usize)
                    .ok_or(RuntimeError::FieldOutOfRange { slot: slot.0 })?;
                *field = value;
                Ok(())
            }
        }
    }

    fn as_shared(&self) -> &InstanceState {
        match self {
            StateRef::Shared(s) => s,
            StateRef::Exclusive(s) => s,
        }
    }
}

/// What a behavior is being evaluated as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EvalMode {
    /// Read-only; any side effect is a contract violation
    Precondition,
    /// Read-only query through a pull binding
    Getter,
    /// Action, reaction, or initializer body
    Body,
}

/// Control flow out of an op sequence
pub(crate) enum Flow {
    Continue,
    Return,
}

/// One evaluation of an op sequence against an instance
pub(crate) struct Eval<'a> {
    pub exec: &'a mut Executor,
    pub registry: &'a Registry,
    pub instance: InstanceId,
    pub iota: u32,
    pub mode: EvalMode,
}

impl<'a> Eval<'a> {
    pub(crate) fn run(&mut self, ops: &[Op], state: &mut StateRef<'_>) -> Result<Flow> {
        for op in ops {
            match op {
                Op::Const(v) => self.exec.push(v.clone()),
                Op::LoadField(slot) => {
                    let v = state.get(*slot)?;
                    self.exec.push(v);
                }
                Op::StoreField(slot) => {
                    self.deny_mutation("field store")?;
                    if !self.exec.in_mutable_phase() {
                        return Err(RuntimeError::StoreOutsideMutablePhase);
                    }
                    let v = self.exec.pop()?;
                    state.set(*slot, v)?;
                }
                Op::LoadFieldAt => {
                    let slot = self.pop_slot()?;
                    let v = state.get(slot)?;
                    self.exec.push(v);
                }
                Op::StoreFieldAt => {
                    self.deny_mutation("field store")?;
                    if !self.exec.in_mutable_phase() {
                        return Err(RuntimeError::StoreOutsideMutablePhase);
                    }
                    let slot = self.pop_slot()?;
                    let v = self.exec.pop()?;
                    state.set(slot, v)?;
                }
                Op::LoadLocal(i) => {
                    let v = self.exec.local(*i)?;
                    self.exec.push(v);
                }
                Op::StoreLocal(i) => {
                    let v = self.exec.pop()?;
                    self.exec.set_local(*i, v);
                }
                Op::LoadParam(i) => {
                    let v = self.exec.param(*i)?;
                    self.exec.push(v);
                }
                Op::LoadIota => self.exec.push(Value::Int(self.iota as i64)),
                Op::Binary(op) => {
                    let right = self.exec.pop()?;
                    let left = self.exec.pop()?;
                    self.exec.push(binary(*op, &left, &right)?);
                }
                Op::Unary(op) => {
                    let operand = self.exec.pop()?;
                    self.exec.push(unary(*op, &operand)?);
                }
                Op::Pop => {
                    self.exec.pop()?;
                }
                Op::PullPort(port) => {
                    let v = self.pull(*port, state)?;
                    self.exec.push(v);
                }
                Op::Fire(port) => {
                    self.deny_mutation("port fire")?;
                    self.fire(*port)?;
                }
                Op::Print => {
                    if self.mode == EvalMode::Precondition {
                        return Err(RuntimeError::PreconditionSideEffect);
                    }
                    let v = self.exec.pop()?;
                    self.exec.output().writeln(&v.to_string())?;
                }
                Op::Activate(body) => {
                    self.deny_mutation("activate")?;
                    let prev = self.exec.open_window();
                    let flow = self.run(body, state);
                    self.exec.set_window(prev);
                    if let Flow::Return = flow? {
                        return Ok(Flow::Return);
                    }
                }
                Op::If { then_ops, else_ops } => {
                    let cond = self.exec.pop()?.as_bool()?;
                    let arm = if cond { then_ops } else { else_ops };
                    if let Flow::Return = self.run(arm, state)? {
                        return Ok(Flow::Return);
                    }
                }
                Op::While { condition, body } => loop {
                    self.run(condition, state)?;
                    if !self.exec.pop()?.as_bool()? {
                        break;
                    }
                    if let Flow::Return = self.run(body, state)? {
                        return Ok(Flow::Return);
                    }
                },
                Op::Return => return Ok(Flow::Return),
            }
        }
        Ok(Flow::Continue)
    }

    fn pop_slot(&mut self) -> Result<FieldSlot> {
        let index = self.exec.pop()?.as_int()?;
        let slot = u32::try_from(index)
            .map_err(|_| RuntimeError::Internal(format!("negative field index {index}")))?;
        Ok(FieldSlot(slot))
    }

    fn deny_mutation(&self, what: &str) -> Result<()> {
        match self.mode {
            EvalMode::Body => Ok(()),
            EvalMode::Precondition => Err(RuntimeError::PreconditionSideEffect),
            EvalMode::Getter => Err(RuntimeError::Internal(format!(
                "getter attempted a {what}"
            ))),
        }
    }

    /// Fan a popped value out to every reaction bound to the port
    ///
    /// Work is enqueued, never dispatched inline; that keeps trigger
    /// decoupled from execution order and preserves non-reentrancy.
    fn fire(&mut self, port: PortId) -> Result<()> {
        let registry = self.registry;
        let instance = registry.instance(self.instance)?;
        let ty = registry.ty(instance.ty)?;
        if port.0 as usize >= ty.push_ports.len() {
            return Err(RuntimeError::UnknownPort {
                component: ty.name.clone(),
                index: port.0,
            });
        }
        let value = self.exec.pop()?;
        for binding in registry.push_targets(self.instance, port) {
            tracing::trace!(
                source = %instance.name,
                port = %ty.push_ports[port.0 as usize],
                target = binding.target.0,
                "push port fired"
            );
            self.exec.enqueue(WorkItem {
                target: binding.target,
                reaction: binding.reaction,
                value: value.clone(),
                parameter: binding.parameter,
            });
        }
        Ok(())
    }

    /// Resolve a pull port by synchronously evaluating its bound getter
    fn pull(&mut self, port: PortId, state: &mut StateRef<'_>) -> Result<Value> {
        let registry = self.registry;
        let instance = registry.instance(self.instance)?;
        let ty = registry.ty(instance.ty)?;
        if port.0 as usize >= ty.pull_ports.len() {
            return Err(RuntimeError::UnknownPort {
                component: ty.name.clone(),
                index: port.0,
            });
        }
        let binding = registry
            .pull_binding(self.instance, port)
            .ok_or_else(|| RuntimeError::UnboundPullPort {
                instance: instance.name.clone(),
                port: ty.pull_ports[port.0 as usize].clone(),
            })?
            .clone();

        let target = registry.instance(binding.target)?;
        let getter = registry.ty(target.ty)?.getter(binding.getter)?;

        if binding.target == self.instance {
            // Pulling from a getter on the instance we are already holding;
            // reuse the held state rather than taking the lock again.
            self.eval_getter(binding.target, &getter.body, state.as_shared())
        } else {
            let guard = target.lock();
            if !guard.initialized {
                return Err(RuntimeError::InstanceNotInitialized(target.name.clone()));
            }
            self.eval_getter(binding.target, &getter.body, &guard)
        }
    }

    /// Run a getter body in a fresh frame with the window closed, leaving
    /// the caller's stack untouched below `base`
    fn eval_getter(
        &mut self,
        target: InstanceId,
        ops: &[Op],
        state: &InstanceState,
    ) -> Result<Value> {
        let frame = self.exec.save_frame();
        let saved = (self.instance, self.iota, self.mode);
        let base = self.exec.stack_len();
        self.exec.set_current(Some(target));
        self.instance = target;
        self.iota = 0;
        self.mode = EvalMode::Getter;

        let mut view = StateRef::Shared(state);
        let result = self.run(ops, &mut view);
        let value = match result {
            Ok(_) => {
                if self.exec.stack_len() > base {
                    self.exec.pop()
                } else {
                    Ok(Value::Unit)
                }
            }
            Err(e) => Err(e),
        };

        self.exec.truncate_stack(base);
        (self.instance, self.iota, self.mode) = saved;
        self.exec.restore_frame(frame);
        value
    }
}
