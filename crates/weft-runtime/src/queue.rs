//! The instance work queue
//!
//! Push-port firings enqueue work here instead of invoking the bound
//! reaction inline; workers pop items to pick up further work. The queue is
//! the multi-producer coordination point between concurrent executors.

use crate::{InstanceId, ReactionId, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A fired push-port edge awaiting delivery
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub target: InstanceId,
    pub reaction: ReactionId,
    /// The value the port fired
    pub value: Value,
    /// The integer parameter recorded at bind time
    pub parameter: i64,
}

/// Multi-producer FIFO of instances needing re-evaluation
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: WorkItem) {
        tracing::trace!(target = item.target.0, reaction = item.reaction.0, "enqueue");
        self.lock().push_back(item);
    }

    pub fn pop(&self) -> Option<WorkItem> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<WorkItem>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let queue = WorkQueue::new();
        for i in 0..3 {
            queue.push(WorkItem {
                target: InstanceId(i),
                reaction: ReactionId(0),
                value: Value::Unit,
                parameter: 0,
            });
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop().unwrap().target, InstanceId(0));
        assert_eq!(queue.pop().unwrap().target, InstanceId(1));
        assert_eq!(queue.pop().unwrap().target, InstanceId(2));
        assert!(queue.is_empty());
    }
}
