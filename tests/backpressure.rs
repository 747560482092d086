//! Global counter back-pressure.

mod support;

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use replicante_task_executor::AnyPayload;
use replicante_task_executor::Config;
use replicante_task_executor::Context;
use replicante_task_executor::Envelope;
use replicante_task_executor::IsolationHandle;
use replicante_task_executor::Task;
use replicante_task_executor::TaskExecutor;

/// A task that blocks its worker until the test drops the other end of
/// `release`. Stands in for the spec's "very slow task" without actually
/// waiting real minutes out.
fn blocking_task(release: crossbeam_channel::Receiver<()>) -> Task {
    Task::input_only(
        move |_input: AnyPayload| {
            let _ = release.recv();
        },
        IsolationHandle::new("test"),
    )
}

#[test]
fn submit_returns_false_once_capacity_is_full() {
    let config = Config {
        max_queue_size: 4,
        threads_count: 4,
    };
    let executor = TaskExecutor::new(support::logger(), config);
    executor.post_construct().expect("worker pool starts");

    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
    for i in 0..4 {
        let context = Context::without_post(format!("identity-{}", i), "test");
        let task = blocking_task(release_rx.clone());
        let envelope = Envelope::new(context, None, None, task);
        assert!(executor.submit(envelope), "submission {} should be accepted", i);
    }

    support::wait_until(|| executor.in_flight() == 4, Duration::from_secs(5));

    let overflow_context = Context::without_post("identity-overflow", "test");
    let overflow_task = Task::input_only(|_input: AnyPayload| {}, IsolationHandle::new("test"));
    let overflow = Envelope::new(overflow_context, None, None, overflow_task);
    assert!(!executor.submit(overflow), "submit must reject once at capacity");

    drop(release_tx);
    executor.stop();
}

#[test]
fn submit_accepts_again_after_in_flight_work_drains() {
    let config = Config {
        max_queue_size: 4,
        threads_count: 4,
    };
    let executor = TaskExecutor::new(support::logger(), config);
    executor.post_construct().expect("worker pool starts");

    let completed = Arc::new(Mutex::new(0usize));
    let mut accepted = 0;
    for i in 0..8 {
        let completed = Arc::clone(&completed);
        let context = Context::without_post(format!("identity-{}", i), "test");
        let task = Task::input_only(
            move |_input: AnyPayload| {
                std::thread::sleep(Duration::from_millis(50));
                *completed.lock().expect("completed lock poisoned") += 1;
            },
            IsolationHandle::new("test"),
        );
        let envelope = Envelope::new(context, None, None, task);
        if executor.submit(envelope) {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 4, "only capacity-many submissions should be accepted");

    support::wait_until(
        || *completed.lock().expect("completed lock poisoned") == accepted,
        Duration::from_secs(10),
    );

    let later_completed = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&later_completed);
    let context = Context::without_post("identity-later", "test");
    let task = Task::input_only(
        move |_input: AnyPayload| {
            *flag.lock().expect("flag lock poisoned") = true;
        },
        IsolationHandle::new("test"),
    );
    let envelope = Envelope::new(context, None, None, task);
    assert!(executor.submit(envelope), "submit should accept again once drained");

    support::wait_until(
        || *later_completed.lock().expect("flag lock poisoned"),
        Duration::from_secs(5),
    );
    executor.stop();
}
