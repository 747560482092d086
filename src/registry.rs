//! Identity -> `TaskQueue` mapping.
//!
//! Get-or-create is the one shared lock on the submission hot path;
//! contention on a single identity is acceptable because that identity is
//! serialised by design. Removal is opportunistic only: an identity's
//! queue is dropped from the map when it goes idle with no one else
//! holding a reference to it, never eagerly.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::queue::TaskQueue;

pub type SharedQueue = Arc<Mutex<TaskQueue>>;

#[derive(Default)]
pub struct QueueRegistry {
    queues: Mutex<HashMap<String, SharedQueue>>,
}

impl QueueRegistry {
    pub fn new() -> QueueRegistry {
        QueueRegistry::default()
    }

    /// Atomically look up or create the queue for `identity`.
    pub fn get_or_create(&self, identity: &str) -> SharedQueue {
        let mut queues = self.queues.lock().expect("queue registry lock poisoned");
        queues
            .entry(identity.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(TaskQueue::new())))
            .clone()
    }

    /// Look up a queue without creating one, for read-only introspection.
    pub fn get(&self, identity: &str) -> Option<SharedQueue> {
        let queues = self.queues.lock().expect("queue registry lock poisoned");
        queues.get(identity).cloned()
    }

    /// Opportunistically drop an identity's queue entry once it is idle and
    /// no one else (e.g. a worker about to republish it) holds a clone.
    pub fn remove_if_unused(&self, identity: &str, queue: &SharedQueue) {
        let mut queues = self.queues.lock().expect("queue registry lock poisoned");
        if let Some(existing) = queues.get(identity) {
            // 2 = this function's `queue` clone + the map's own entry.
            if Arc::ptr_eq(existing, queue) && Arc::strong_count(existing) <= 2 {
                queues.remove(identity);
            }
        }
    }

    pub fn identities(&self) -> Vec<String> {
        let queues = self.queues.lock().expect("queue registry lock poisoned");
        queues.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_returns_same_queue_for_same_identity() {
        let registry = QueueRegistry::new();
        let a = registry.get_or_create("id-1");
        let b = registry.get_or_create("id-1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_identities_get_distinct_queues() {
        let registry = QueueRegistry::new();
        let a = registry.get_or_create("id-1");
        let b = registry.get_or_create("id-2");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn get_without_create_returns_none_for_unknown_identity() {
        let registry = QueueRegistry::new();
        assert!(registry.get("missing").is_none());
    }
}
