//! The action/reaction scheduler
//!
//! Decides which actions may fire, executes them under per-instance
//! exclusivity, delivers queued reactions, and drives everything to
//! quiescence. Multiple workers may run concurrently, each with its own
//! executor; the only shared coordination points are the per-instance
//! state locks, the work queue, and the output stream.

use crate::eval::{Eval, EvalMode, StateRef};
use crate::{
    ActionId, Executor, InstanceId, OutputStream, Registry, Result, RuntimeError, Value, WorkItem,
    WorkQueue,
};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Counters from a scheduling run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    pub actions_run: u64,
    pub reactions_run: u64,
    pub rounds: u64,
}

/// The scheduling runtime for one program
#[derive(Debug)]
pub struct Scheduler {
    registry: Arc<Registry>,
    queue: Arc<WorkQueue>,
    output: Arc<OutputStream>,
}

impl Scheduler {
    pub fn new(registry: Registry) -> Self {
        Self::with_output(registry, OutputStream::stdout())
    }

    pub fn with_output(registry: Registry, output: OutputStream) -> Self {
        Self {
            registry: Arc::new(registry),
            queue: Arc::new(WorkQueue::new()),
            output: Arc::new(output),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// A fresh executor wired to this scheduler's queue and output stream
    pub fn executor(&self) -> Executor {
        Executor::new(Arc::clone(&self.queue), Arc::clone(&self.output))
    }

    /// Run an instance's initializers and mark it schedulable
    pub fn initialize(&self, exec: &mut Executor, instance: InstanceId) -> Result<()> {
        let inst = self.registry.instance(instance)?;
        let ty = self.registry.ty(inst.ty)?;
        let mut guard = inst.lock();

        for init in &ty.initializers {
            trace!(instance = %inst.name, initializer = %init.name, "running initializer");
            exec.reset(Some(instance));
            exec.open_window();
            let mut eval = Eval {
                exec: &mut *exec,
                registry: &self.registry,
                instance,
                iota: 0,
                mode: EvalMode::Body,
            };
            let mut state = StateRef::Exclusive(&mut guard);
            eval.run(&init.body, &mut state)?;
            exec.set_window(None);
        }
        guard.initialized = true;
        exec.reset(None);
        Ok(())
    }

    /// Initialize every instance in registration order
    pub fn initialize_all(&self, exec: &mut Executor) -> Result<()> {
        for instance in self.registry.instance_ids() {
            self.initialize(exec, instance)?;
        }
        Ok(())
    }

    /// Evaluate an action's precondition against the instance's current
    /// state
    ///
    /// Read-only: evaluation never enters a mutable phase, and a
    /// precondition that attempts a side effect is a contract violation.
    /// Uninitialized instances are never enabled.
    pub fn enabled(
        &self,
        exec: &mut Executor,
        instance: InstanceId,
        action: ActionId,
        iota: u32,
    ) -> Result<bool> {
        let inst = self.registry.instance(instance)?;
        let ty = self.registry.ty(inst.ty)?;
        let def = ty.action(action)?;
        check_iota(def.name.as_str(), def.iota, iota)?;

        let guard = inst.lock();
        if !guard.initialized {
            return Ok(false);
        }
        self.precondition_holds(exec, instance, action, iota, &guard)
    }

    fn precondition_holds(
        &self,
        exec: &mut Executor,
        instance: InstanceId,
        action: ActionId,
        iota: u32,
        state: &crate::InstanceState,
    ) -> Result<bool> {
        let inst = self.registry.instance(instance)?;
        let def = self.registry.ty(inst.ty)?.action(action)?;

        exec.reset(Some(instance));
        let mut eval = Eval {
            exec: &mut *exec,
            registry: &self.registry,
            instance,
            iota,
            mode: EvalMode::Precondition,
        };
        let mut view = StateRef::Shared(state);
        eval.run(&def.precondition, &mut view)?;
        exec.pop()?.as_bool()
    }

    /// Run an action's body for a specific instance and iota index
    ///
    /// Takes the instance lock for the whole body (per-instance mutable
    /// phase exclusivity), re-checks the precondition defensively under
    /// that lock, and returns `Ok(false)` without running if it no longer
    /// holds. Push ports fired by the body enqueue their targets; they are
    /// never dispatched inline.
    pub fn execute(
        &self,
        exec: &mut Executor,
        instance: InstanceId,
        action: ActionId,
        iota: u32,
    ) -> Result<bool> {
        let inst = self.registry.instance(instance)?;
        let ty = self.registry.ty(inst.ty)?;
        let def = ty.action(action)?;
        check_iota(def.name.as_str(), def.iota, iota)?;

        let mut guard = inst.lock();
        if !guard.initialized {
            return Ok(false);
        }
        if !self.precondition_holds(exec, instance, action, iota, &guard)? {
            return Ok(false);
        }

        debug!(instance = %inst.name, action = %def.name, iota, "executing action");
        exec.reset(Some(instance));
        exec.open_window();
        let mut eval = Eval {
            exec: &mut *exec,
            registry: &self.registry,
            instance,
            iota,
            mode: EvalMode::Body,
        };
        let mut state = StateRef::Exclusive(&mut guard);
        let result = eval.run(&def.body, &mut state);
        exec.set_window(None);
        exec.set_current(None);
        result?;
        Ok(true)
    }

    /// Deliver one queued push-port firing to its bound reaction
    fn run_reaction(&self, exec: &mut Executor, item: WorkItem) -> Result<()> {
        let inst = self.registry.instance(item.target)?;
        let ty = self.registry.ty(inst.ty)?;
        let def = ty.reaction(item.reaction)?;

        let mut guard = inst.lock();
        if !guard.initialized {
            return Err(RuntimeError::InstanceNotInitialized(inst.name.clone()));
        }

        debug!(instance = %inst.name, reaction = %def.name, "delivering reaction");
        exec.reset(Some(item.target));
        exec.set_params(vec![item.value, Value::Int(item.parameter)]);
        exec.open_window();
        let mut eval = Eval {
            exec: &mut *exec,
            registry: &self.registry,
            instance: item.target,
            iota: 0,
            mode: EvalMode::Body,
        };
        let mut state = StateRef::Exclusive(&mut guard);
        let result = eval.run(&def.body, &mut state);
        exec.set_window(None);
        exec.set_current(None);
        result?;
        Ok(())
    }

    /// Deliver every queued reaction, returning how many ran
    pub fn drain(&self, exec: &mut Executor) -> Result<u64> {
        let mut delivered = 0;
        while let Some(item) = self.queue.pop() {
            self.run_reaction(exec, item)?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Single-worker driver: execute enabled actions and deliver reactions
    /// until quiescence
    pub fn run(&self, exec: &mut Executor) -> Result<RunStats> {
        let units = self.registry.schedulable_units();
        let mut stats = RunStats::default();
        loop {
            let mut progress = 0u64;
            stats.reactions_run += self.drain(exec)?;
            for &(instance, action, iota) in &units {
                if self.execute(exec, instance, action, iota)? {
                    stats.actions_run += 1;
                    progress += 1;
                }
                let delivered = self.drain(exec)?;
                stats.reactions_run += delivered;
                progress += delivered;
            }
            stats.rounds += 1;
            if progress == 0 && self.queue.is_empty() {
                debug!(rounds = stats.rounds, "quiescent");
                return Ok(stats);
            }
        }
    }

    /// Multi-worker driver
    ///
    /// Each round distributes the schedulable units over `workers` OS
    /// threads, each with its own executor; reactions are delivered from
    /// the shared queue as they appear. Rounds repeat until one passes with
    /// no progress and an empty queue.
    pub fn run_workers(&self, workers: usize) -> Result<RunStats> {
        let workers = workers.max(1);
        let units = self.registry.schedulable_units();
        let mut stats = RunStats::default();

        loop {
            let cursor = AtomicUsize::new(0);
            let actions = AtomicU64::new(0);
            let reactions = AtomicU64::new(0);
            let failure: Mutex<Option<RuntimeError>> = Mutex::new(None);

            std::thread::scope(|scope| {
                for _ in 0..workers {
                    scope.spawn(|| {
                        let mut exec = self.executor();
                        loop {
                            // Deliver queued reactions before claiming more
                            // action work.
                            while let Some(item) = self.queue.pop() {
                                match self.run_reaction(&mut exec, item) {
                                    Ok(()) => {
                                        reactions.fetch_add(1, Ordering::Relaxed);
                                    }
                                    Err(e) => {
                                        record_failure(&failure, e);
                                        return;
                                    }
                                }
                            }
                            let index = cursor.fetch_add(1, Ordering::Relaxed);
                            let Some(&(instance, action, iota)) = units.get(index) else {
                                return;
                            };
                            match self.execute(&mut exec, instance, action, iota) {
                                Ok(true) => {
                                    actions.fetch_add(1, Ordering::Relaxed);
                                }
                                Ok(false) => {}
                                Err(e) => {
                                    record_failure(&failure, e);
                                    return;
                                }
                            }
                        }
                    });
                }
            });

            if let Some(e) = failure.into_inner().unwrap_or_else(|e| e.into_inner()) {
                return Err(e);
            }

            let round_actions = actions.into_inner();
            let round_reactions = reactions.into_inner();
            stats.actions_run += round_actions;
            stats.reactions_run += round_reactions;
            stats.rounds += 1;

            if round_actions == 0 && round_reactions == 0 && self.queue.is_empty() {
                debug!(rounds = stats.rounds, "quiescent");
                return Ok(stats);
            }
        }
    }
}

fn record_failure(slot: &Mutex<Option<RuntimeError>>, error: RuntimeError) {
    let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
    if slot.is_none() {
        *slot = Some(error);
    }
}

fn check_iota(action: &str, extent: Option<u32>, iota: u32) -> Result<()> {
    let extent = extent.unwrap_or(1);
    if iota >= extent {
        return Err(RuntimeError::IotaOutOfRange {
            action: action.to_string(),
            iota,
        });
    }
    Ok(())
}
