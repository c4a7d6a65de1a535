//! Component types, instances, and port bindings

use crate::{
    ActionId, GetterId, InstanceId, Op, PortId, ReactionId, Result, RuntimeError, TypeId, Value,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A lowered action definition
#[derive(Debug, Clone)]
pub struct ActionDef {
    pub name: String,
    /// `Some(n)` replicates the action over iota indices `0..n`
    pub iota: Option<u32>,
    pub precondition: Vec<Op>,
    pub body: Vec<Op>,
}

/// A lowered reaction definition
#[derive(Debug, Clone)]
pub struct ReactionDef {
    pub name: String,
    pub body: Vec<Op>,
}

/// A lowered getter definition
#[derive(Debug, Clone)]
pub struct GetterDef {
    pub name: String,
    pub body: Vec<Op>,
}

/// A lowered initializer definition
#[derive(Debug, Clone)]
pub struct InitializerDef {
    pub name: String,
    pub body: Vec<Op>,
}

/// A lowered component type
#[derive(Debug, Clone, Default)]
pub struct ComponentType {
    pub name: String,
    pub field_count: u32,
    pub initializers: Vec<InitializerDef>,
    pub getters: Vec<GetterDef>,
    pub actions: Vec<ActionDef>,
    pub reactions: Vec<ReactionDef>,
    pub push_ports: Vec<String>,
    pub pull_ports: Vec<String>,
}

impl ComponentType {
    pub fn new(name: impl Into<String>, field_count: u32) -> Self {
        Self {
            name: name.into(),
            field_count,
            ..Self::default()
        }
    }

    pub fn add_initializer(&mut self, def: InitializerDef) {
        self.initializers.push(def);
    }

    pub fn add_getter(&mut self, def: GetterDef) -> GetterId {
        self.getters.push(def);
        GetterId(self.getters.len() as u32 - 1)
    }

    pub fn add_action(&mut self, def: ActionDef) -> ActionId {
        self.actions.push(def);
        ActionId(self.actions.len() as u32 - 1)
    }

    pub fn add_reaction(&mut self, def: ReactionDef) -> ReactionId {
        self.reactions.push(def);
        ReactionId(self.reactions.len() as u32 - 1)
    }

    pub fn add_push_port(&mut self, name: impl Into<String>) -> PortId {
        self.push_ports.push(name.into());
        PortId(self.push_ports.len() as u32 - 1)
    }

    pub fn add_pull_port(&mut self, name: impl Into<String>) -> PortId {
        self.pull_ports.push(name.into());
        PortId(self.pull_ports.len() as u32 - 1)
    }

    pub fn action(&self, id: ActionId) -> Result<&ActionDef> {
        self.actions
            .get(id.0 as usize)
            .ok_or_else(|| RuntimeError::UnknownAction {
                component: self.name.clone(),
                index: id.0,
            })
    }

    pub fn reaction(&self, id: ReactionId) -> Result<&ReactionDef> {
        self.reactions
            .get(id.0 as usize)
            .ok_or_else(|| RuntimeError::UnknownReaction {
                component: self.name.clone(),
                index: id.0,
            })
    }

    pub fn getter(&self, id: GetterId) -> Result<&GetterDef> {
        self.getters
            .get(id.0 as usize)
            .ok_or_else(|| RuntimeError::UnknownGetter {
                component: self.name.clone(),
                index: id.0,
            })
    }
}

/// The mutable heap block of a component instance
#[derive(Debug, Clone)]
pub struct InstanceState {
    pub fields: Vec<Value>,
    /// Set once the initializers have run; uninitialized instances are
    /// never considered enabled
    pub initialized: bool,
}

/// A component instance
///
/// The state sits behind a per-instance mutex; holding its guard is what
/// "holding the instance's mutable phase" means at runtime. Instances are
/// created at program initialization and live until teardown.
#[derive(Debug)]
pub struct Instance {
    pub name: String,
    pub ty: TypeId,
    state: Mutex<InstanceState>,
}

impl Instance {
    fn new(name: String, ty: TypeId, field_count: u32) -> Self {
        Self {
            name,
            ty,
            state: Mutex::new(InstanceState {
                fields: vec![Value::Unit; field_count as usize],
                initialized: false,
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, InstanceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current state, for inspection after a run
    pub fn snapshot(&self) -> InstanceState {
        self.lock().clone()
    }
}

/// A push edge: output port on a source instance to a reaction on a target
#[derive(Debug, Clone)]
pub struct PushBinding {
    pub target: InstanceId,
    pub reaction: ReactionId,
    pub parameter: i64,
}

/// A pull edge: input port reads a getter on the target instance
#[derive(Debug, Clone)]
pub struct PullBinding {
    pub target: InstanceId,
    pub getter: GetterId,
}

/// All component types, instances, and bindings of one program
///
/// Built during program initialization, then read-only while scheduling
/// runs. Only the per-instance state blocks stay mutable, behind their
/// own locks.
#[derive(Debug, Default)]
pub struct Registry {
    types: Vec<ComponentType>,
    instances: Vec<Instance>,
    push_bindings: HashMap<(InstanceId, PortId), Vec<PushBinding>>,
    pull_bindings: HashMap<(InstanceId, PortId), PullBinding>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_type(&mut self, ty: ComponentType) -> TypeId {
        self.types.push(ty);
        TypeId(self.types.len() as u32 - 1)
    }

    /// Allocate an instance's heap block; initializers run later, through
    /// the scheduler
    pub fn instantiate(&mut self, name: impl Into<String>, ty: TypeId) -> Result<InstanceId> {
        let field_count = self.ty(ty)?.field_count;
        self.instances
            .push(Instance::new(name.into(), ty, field_count));
        Ok(InstanceId(self.instances.len() as u32 - 1))
    }

    /// Register a push edge
    ///
    /// Bindings accumulate: binding the same port again adds a fan-out
    /// edge, it does not replace earlier ones.
    pub fn bind(
        &mut self,
        source: InstanceId,
        port: PortId,
        target: InstanceId,
        reaction: ReactionId,
        parameter: i64,
    ) -> Result<()> {
        let source_ty = self.ty(self.instance(source)?.ty)?;
        if port.0 as usize >= source_ty.push_ports.len() {
            return Err(RuntimeError::UnknownPort {
                component: source_ty.name.clone(),
                index: port.0,
            });
        }
        let target_ty = self.ty(self.instance(target)?.ty)?;
        target_ty.reaction(reaction)?;

        self.push_bindings
            .entry((source, port))
            .or_default()
            .push(PushBinding {
                target,
                reaction,
                parameter,
            });
        Ok(())
    }

    /// Register a pull edge
    ///
    /// A pull port reads exactly one getter; binding again replaces the
    /// previous edge. Cross-instance pull edges must form an acyclic graph:
    /// a pull resolves under the reader's instance lock, so a cycle of pull
    /// edges is a lock-ordering cycle between workers. A self-edge takes no
    /// second lock and stays allowed.
    pub fn bind_pull(
        &mut self,
        source: InstanceId,
        port: PortId,
        target: InstanceId,
        getter: GetterId,
    ) -> Result<()> {
        let source_ty = self.ty(self.instance(source)?.ty)?;
        if port.0 as usize >= source_ty.pull_ports.len() {
            return Err(RuntimeError::UnknownPort {
                component: source_ty.name.clone(),
                index: port.0,
            });
        }
        let target_ty = self.ty(self.instance(target)?.ty)?;
        target_ty.getter(getter)?;

        if source != target && self.pull_reaches(target, source) {
            return Err(RuntimeError::PullBindingCycle {
                from: self.instance(source)?.name.clone(),
                target: self.instance(target)?.name.clone(),
            });
        }

        self.pull_bindings
            .insert((source, port), PullBinding { target, getter });
        Ok(())
    }

    /// Whether `to` is reachable from `from` along registered pull edges
    fn pull_reaches(&self, from: InstanceId, to: InstanceId) -> bool {
        let mut seen = vec![false; self.instances.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if std::mem::replace(&mut seen[id.0 as usize], true) {
                continue;
            }
            for ((src, _), binding) in &self.pull_bindings {
                if *src == id {
                    stack.push(binding.target);
                }
            }
        }
        false
    }

    pub fn ty(&self, id: TypeId) -> Result<&ComponentType> {
        self.types
            .get(id.0 as usize)
            .ok_or(RuntimeError::UnknownType(id.0))
    }

    pub fn instance(&self, id: InstanceId) -> Result<&Instance> {
        self.instances
            .get(id.0 as usize)
            .ok_or(RuntimeError::UnknownInstance(id.0))
    }

    pub fn instance_ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        (0..self.instances.len() as u32).map(InstanceId)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn push_targets(&self, source: InstanceId, port: PortId) -> &[PushBinding] {
        self.push_bindings
            .get(&(source, port))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn pull_binding(&self, source: InstanceId, port: PortId) -> Option<&PullBinding> {
        self.pull_bindings.get(&(source, port))
    }

    /// Every (instance, action, iota) combination, the flat list of
    /// schedulable units the driver scans
    pub fn schedulable_units(&self) -> Vec<(InstanceId, ActionId, u32)> {
        let mut units = Vec::new();
        for (i, instance) in self.instances.iter().enumerate() {
            let Ok(ty) = self.ty(instance.ty) else {
                continue;
            };
            for (a, action) in ty.actions.iter().enumerate() {
                for iota in 0..action.iota.unwrap_or(1) {
                    units.push((InstanceId(i as u32), ActionId(a as u32), iota));
                }
            }
        }
        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_port_pair() -> (Registry, InstanceId, InstanceId, PortId, ReactionId) {
        let mut registry = Registry::new();
        let mut source_ty = ComponentType::new("Source", 0);
        let port = source_ty.add_push_port("out");
        let source_ty = registry.register_type(source_ty);

        let mut sink_ty = ComponentType::new("Sink", 1);
        let reaction = sink_ty.add_reaction(ReactionDef {
            name: "on_value".into(),
            body: Vec::new(),
        });
        let sink_ty = registry.register_type(sink_ty);

        let source = registry.instantiate("source", source_ty).unwrap();
        let sink = registry.instantiate("sink", sink_ty).unwrap();
        (registry, source, sink, port, reaction)
    }

    #[test]
    fn push_bindings_accumulate() {
        let (mut registry, source, sink, port, reaction) = registry_with_port_pair();
        registry.bind(source, port, sink, reaction, 0).unwrap();
        registry.bind(source, port, sink, reaction, 1).unwrap();

        let targets = registry.push_targets(source, port);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].parameter, 0);
        assert_eq!(targets[1].parameter, 1);
    }

    #[test]
    fn bind_rejects_unknown_port_and_reaction() {
        let (mut registry, source, sink, port, _) = registry_with_port_pair();
        let err = registry
            .bind(source, PortId(7), sink, ReactionId(0), 0)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownPort { .. }));

        let err = registry
            .bind(source, port, sink, ReactionId(9), 0)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownReaction { .. }));
    }

    #[test]
    fn pull_cycles_are_rejected_at_bind_time() {
        let mut registry = Registry::new();
        let mut ty = ComponentType::new("Relay", 1);
        let port = ty.add_pull_port("up");
        let getter = ty.add_getter(GetterDef {
            name: "level".into(),
            body: vec![Op::Const(Value::Int(1))],
        });
        let ty = registry.register_type(ty);
        let a = registry.instantiate("a", ty).unwrap();
        let b = registry.instantiate("b", ty).unwrap();
        let c = registry.instantiate("c", ty).unwrap();

        registry.bind_pull(a, port, b, getter).unwrap();
        registry.bind_pull(b, port, c, getter).unwrap();

        // Closing the chain back to its head is a lock-ordering cycle.
        let err = registry.bind_pull(c, port, a, getter).unwrap_err();
        assert!(matches!(err, RuntimeError::PullBindingCycle { .. }));
        assert_eq!(err.code(), "E-RT-017");

        // A self-edge never takes a second instance lock.
        registry.bind_pull(c, port, c, getter).unwrap();
    }

    #[test]
    fn dimensioned_actions_expand_to_one_unit_per_index() {
        let mut registry = Registry::new();
        let mut ty = ComponentType::new("Grid", 0);
        ty.add_action(ActionDef {
            name: "tick".into(),
            iota: Some(3),
            precondition: vec![Op::Const(Value::Bool(false))],
            body: Vec::new(),
        });
        let ty = registry.register_type(ty);
        registry.instantiate("grid", ty).unwrap();

        let units = registry.schedulable_units();
        assert_eq!(units.len(), 3);
        assert_eq!(units[2].2, 2);
    }
}
