use lazy_static::lazy_static;
use prometheus::Counter;
use prometheus::Gauge;
use prometheus::Registry;
use slog::debug;
use slog::Logger;

lazy_static! {
    pub static ref TASKS_ACCEPTED_TOTAL: Counter = Counter::new(
        "replicore_task_executor_accepted_total",
        "Number of submissions accepted by the executor"
    )
    .expect("Failed to create TASKS_ACCEPTED_TOTAL counter");
    pub static ref TASKS_REJECTED_TOTAL: Counter = Counter::new(
        "replicore_task_executor_rejected_total",
        "Number of submissions rejected because the executor was at capacity"
    )
    .expect("Failed to create TASKS_REJECTED_TOTAL counter");
    pub static ref TASKS_COMPLETED_TOTAL: Counter = Counter::new(
        "replicore_task_executor_completed_total",
        "Number of submissions that reached a terminal state"
    )
    .expect("Failed to create TASKS_COMPLETED_TOTAL counter");
    pub static ref TASK_BODY_ERRORS_TOTAL: Counter = Counter::new(
        "replicore_task_executor_task_body_errors_total",
        "Number of task bodies that panicked"
    )
    .expect("Failed to create TASK_BODY_ERRORS_TOTAL counter");
    pub static ref POST_HOOK_ERRORS_TOTAL: Counter = Counter::new(
        "replicore_task_executor_post_hook_errors_total",
        "Number of post hooks that panicked"
    )
    .expect("Failed to create POST_HOOK_ERRORS_TOTAL counter");
    pub static ref ASYNC_FUTURE_ERRORS_TOTAL: Counter = Counter::new(
        "replicore_task_executor_async_future_errors_total",
        "Number of async completion futures that resolved to an error"
    )
    .expect("Failed to create ASYNC_FUTURE_ERRORS_TOTAL counter");
    pub static ref TASKS_IN_FLIGHT: Gauge = Gauge::new(
        "replicore_task_executor_in_flight",
        "Submissions accepted but not yet completed"
    )
    .expect("Failed to create TASKS_IN_FLIGHT gauge");
}

/// Attempts to register metrics with the Registry.
///
/// Metrics that fail to register are logged and ignored.
pub fn register_metrics(logger: &Logger, registry: &Registry) {
    if let Err(err) = registry.register(Box::new(TASKS_ACCEPTED_TOTAL.clone())) {
        debug!(logger, "Failed to register TASKS_ACCEPTED_TOTAL"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(TASKS_REJECTED_TOTAL.clone())) {
        debug!(logger, "Failed to register TASKS_REJECTED_TOTAL"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(TASKS_COMPLETED_TOTAL.clone())) {
        debug!(logger, "Failed to register TASKS_COMPLETED_TOTAL"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(TASK_BODY_ERRORS_TOTAL.clone())) {
        debug!(logger, "Failed to register TASK_BODY_ERRORS_TOTAL"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(POST_HOOK_ERRORS_TOTAL.clone())) {
        debug!(logger, "Failed to register POST_HOOK_ERRORS_TOTAL"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(ASYNC_FUTURE_ERRORS_TOTAL.clone())) {
        debug!(logger, "Failed to register ASYNC_FUTURE_ERRORS_TOTAL"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(TASKS_IN_FLIGHT.clone())) {
        debug!(logger, "Failed to register TASKS_IN_FLIGHT"; "error" => ?err);
    }
}
