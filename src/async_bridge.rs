//! Binds a task's deferred future to queue resumption.
//!
//! No tokio (or other async runtime) dependency is pulled in for this: the
//! engine's own worker threads only ever do blocking dispatch work, so a
//! deferred completion is modelled the same way `replicante_tasks` models
//! long-running work it cannot fit on a worker thread, on a dedicated OS
//! thread, here driving the future to completion with
//! `futures::executor::block_on`. The calling worker thread returns to the
//! pool immediately; it never blocks on this.

use std::sync::Arc;

use slog::error;

use crate::error::catch;
use crate::isolation::IsolationHandle;
use crate::registry::SharedQueue;
use crate::shared::Shared;
use crate::task::AsyncFuture;
use crate::task::TaskOutput;

type PostHook = Arc<dyn Fn(Box<dyn TaskOutput>) + Send + Sync>;

/// Spawn a thread that drives `future` to completion, then runs the post
/// hook and the terminal queue transition.
///
/// Errors from the future are logged and swallowed: they must not skip the
/// terminal transition, or the identity would stall forever.
pub(crate) fn spawn(
    shared: Arc<Shared>,
    identity: String,
    queue: SharedQueue,
    isolation: IsolationHandle,
    future: AsyncFuture,
    output: Box<dyn TaskOutput>,
    post: Option<PostHook>,
) {
    let builder = std::thread::Builder::new().name(format!("task-exec-async-{}", identity));
    let thread_identity = identity.clone();
    let thread_queue = queue.clone();
    let thread_shared = Arc::clone(&shared);
    let spawned = builder.spawn(move || {
        let result = futures::executor::block_on(future);
        if let Err(error) = result {
            crate::metrics::ASYNC_FUTURE_ERRORS_TOTAL.inc();
            error!(thread_shared.logger, "Async completion future failed"; "identity" => %thread_identity, "error" => ?error);
        }

        let _guard = isolation.install();
        if let Some(post) = post {
            if catch(|| post(output)).is_err() {
                crate::metrics::POST_HOOK_ERRORS_TOTAL.inc();
                error!(thread_shared.logger, "Post hook failed after async completion"; "identity" => %thread_identity);
            }
        }
        // else: Out task with no post hook configured; `output` is simply dropped.

        thread_shared.complete_submission();
        thread_shared.advance_after_async(&thread_identity, &thread_queue);
    });

    if let Err(error) = spawned {
        error!(shared.logger, "Failed to spawn async completion thread, advancing queue inline"; "error" => ?error);
        shared.complete_submission();
        shared.advance_after_async(&identity, &queue);
    }
}
