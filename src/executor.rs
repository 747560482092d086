//! Public submission facade.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use slog::Logger;

use crate::config::Config;
use crate::intake::Intake;
use crate::intake::ReadyQueue;
use crate::metrics;
use crate::registry::QueueRegistry;
use crate::shared::Shared;
use crate::task::Envelope;
use crate::worker::WorkerPool;
use crate::Result;

/// Per-identity ordered task executor.
///
/// `submit` never blocks: it either accepts the envelope and returns
/// `true`, or rejects it without any side effect and returns `false`.
/// Worker threads are started by `post_construct` (idempotent) and stopped
/// by `stop` (graceful: finishes in-flight work, drops anything still
/// queued).
pub struct TaskExecutor {
    config: Config,
    shared: Arc<Shared>,
    started: AtomicBool,
    pool: Mutex<Option<WorkerPool>>,
}

impl TaskExecutor {
    pub fn new(logger: Logger, config: Config) -> TaskExecutor {
        let shared = Arc::new(Shared {
            registry: Arc::new(QueueRegistry::new()),
            intake: Intake::bounded(config.max_queue_size),
            counter: Arc::new(AtomicUsize::new(0)),
            logger,
        });
        TaskExecutor {
            config,
            shared,
            started: AtomicBool::new(false),
            pool: Mutex::new(None),
        }
    }

    /// Accept or reject a submission.
    ///
    /// Returns `false` iff the global in-flight counter was already at
    /// `config.max_queue_size` at the moment of acceptance; in that case
    /// no state changes at all. Otherwise the envelope is appended to its
    /// identity's queue, publishing that queue to Intake if this was the
    /// first pending envelope for it.
    pub fn submit(&self, envelope: Envelope) -> bool {
        let previous = self.shared.counter.fetch_add(1, Ordering::SeqCst);
        if previous >= self.config.max_queue_size {
            self.shared.counter.fetch_sub(1, Ordering::SeqCst);
            metrics::TASKS_REJECTED_TOTAL.inc();
            return false;
        }
        metrics::TASKS_ACCEPTED_TOTAL.inc();
        metrics::TASKS_IN_FLIGHT.inc();

        let identity = envelope.identity().to_string();
        let queue = self.shared.registry.get_or_create(&identity);
        let became_ready = {
            let mut locked = queue.lock().expect("task queue lock poisoned");
            locked.enqueue(envelope)
        };
        if became_ready {
            self.shared.intake.publish(ReadyQueue { identity, queue });
        }
        true
    }

    /// Lazily start the worker pool. Idempotent: a second call is a no-op.
    pub fn post_construct(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut pool = self.pool.lock().expect("worker pool lock poisoned");
        *pool = Some(WorkerPool::start(Arc::clone(&self.shared), self.config.threads_count)?);
        Ok(())
    }

    /// Signal workers to exit after their current task and wait for them.
    /// Queued-but-unstarted envelopes are dropped without running.
    pub fn stop(&self) {
        let mut pool = self.pool.lock().expect("worker pool lock poisoned");
        if let Some(mut running) = pool.take() {
            running.stop();
        }
        self.started.store(false, Ordering::SeqCst);
    }

    /// Current value of the global in-flight counter.
    pub fn in_flight(&self) -> usize {
        self.shared.counter.load(Ordering::SeqCst)
    }

    /// Pending envelope count for one identity, 0 if it has no queue.
    pub fn queue_depth(&self, identity: &str) -> usize {
        match self.shared.registry.get(identity) {
            Some(queue) => queue.lock().expect("task queue lock poisoned").len(),
            None => 0,
        }
    }

    /// Identities currently tracked by the registry.
    pub fn identities(&self) -> Vec<String> {
        self.shared.registry.identities()
    }
}

impl Drop for TaskExecutor {
    fn drop(&mut self) {
        self.stop();
    }
}
