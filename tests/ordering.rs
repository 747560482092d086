//! Per-identity ordering under concurrent submission.

mod support;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use replicante_task_executor::AnyPayload;
use replicante_task_executor::Config;
use replicante_task_executor::Context;
use replicante_task_executor::Envelope;
use replicante_task_executor::InputFactory;
use replicante_task_executor::IsolationHandle;
use replicante_task_executor::Task;
use replicante_task_executor::TaskExecutor;

fn submit_ordinal(executor: &TaskExecutor, identity: &str, ordinal: usize, seen: Arc<Mutex<Vec<usize>>>) {
    let context = Context::without_post(identity, "test");
    let task = Task::input_only(
        move |input: AnyPayload| {
            let ordinal = *input.downcast::<usize>().expect("usize input");
            seen.lock().expect("seen lock poisoned").push(ordinal);
        },
        IsolationHandle::new("test"),
    );
    let factory: InputFactory = Arc::new(move || Box::new(ordinal));
    let envelope = Envelope::new(context, Some(factory), None, task);
    assert!(executor.submit(envelope), "submission {} rejected", ordinal);
}

#[test]
fn sequential_ordering_within_one_identity() {
    let config = Config {
        max_queue_size: 2_000,
        threads_count: 4,
    };
    let executor = TaskExecutor::new(support::logger(), config);
    executor.post_construct().expect("worker pool starts");

    let seen = Arc::new(Mutex::new(Vec::new()));
    for ordinal in 0..1_000usize {
        submit_ordinal(&executor, "clientid", ordinal, Arc::clone(&seen));
    }

    support::wait_until(
        || seen.lock().expect("seen lock poisoned").len() == 1_000,
        Duration::from_secs(30),
    );
    executor.stop();

    let observed = seen.lock().expect("seen lock poisoned").clone();
    let expected: Vec<usize> = (0..1_000).collect();
    assert_eq!(observed, expected);
}

#[test]
fn no_per_identity_order_violation_across_one_hundred_identities() {
    let config = Config {
        max_queue_size: 2_000,
        threads_count: 8,
    };
    let executor = TaskExecutor::new(support::logger(), config);
    executor.post_construct().expect("worker pool starts");

    let seen: Arc<Mutex<HashMap<usize, Vec<usize>>>> = Arc::new(Mutex::new(HashMap::new()));
    for ordinal in 0..1_000usize {
        let identity = ordinal % 100;
        let seen = Arc::clone(&seen);
        let context = Context::without_post(identity.to_string(), "test");
        let task = Task::input_only(
            move |input: AnyPayload| {
                let ordinal = *input.downcast::<usize>().expect("usize input");
                seen.lock()
                    .expect("seen lock poisoned")
                    .entry(identity)
                    .or_insert_with(Vec::new)
                    .push(ordinal);
            },
            IsolationHandle::new("test"),
        );
        let factory: InputFactory = Arc::new(move || Box::new(ordinal));
        let envelope = Envelope::new(context, Some(factory), None, task);
        assert!(executor.submit(envelope));
    }

    support::wait_until(
        || {
            seen.lock()
                .expect("seen lock poisoned")
                .values()
                .map(|v| v.len())
                .sum::<usize>()
                == 1_000
        },
        Duration::from_secs(30),
    );
    executor.stop();

    let seen = seen.lock().expect("seen lock poisoned");
    for (identity, ordinals) in seen.iter() {
        let mut sorted = ordinals.clone();
        sorted.sort_unstable();
        assert_eq!(
            ordinals, &sorted,
            "identity {} observed out-of-order completions",
            identity
        );
    }
}

#[test]
fn four_producers_fan_out_across_one_hundred_identities() {
    let config = Config {
        max_queue_size: 2_000,
        threads_count: 8,
    };
    let executor = Arc::new(TaskExecutor::new(support::logger(), config));
    executor.post_construct().expect("worker pool starts");

    let completed = Arc::new(Mutex::new(0usize));
    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let executor = Arc::clone(&executor);
            let completed = Arc::clone(&completed);
            std::thread::Builder::new()
                .name(format!("producer-{}", producer))
                .spawn(move || {
                    for i in 0..250usize {
                        let global = producer * 250 + i;
                        let identity = global % 100;
                        let completed = Arc::clone(&completed);
                        let context = Context::without_post(identity.to_string(), "test");
                        let task = Task::input_only(
                            move |_input: AnyPayload| {
                                std::thread::sleep(Duration::from_millis(1));
                                *completed.lock().expect("completed lock poisoned") += 1;
                            },
                            IsolationHandle::new("test"),
                        );
                        let envelope = Envelope::new(context, None, None, task);
                        assert!(executor.submit(envelope), "submission rejected under capacity");
                    }
                })
                .expect("producer thread spawns")
        })
        .collect();

    for producer in producers {
        producer.join().expect("producer thread panicked");
    }

    support::wait_until(
        || *completed.lock().expect("completed lock poisoned") == 1_000,
        Duration::from_secs(30),
    );
    executor.stop();
}
