//! The runtime: materializing a plan onto worker threads and coordinating
//! their lifecycle.

mod worker;


use crate::cancellation::CancellationToken;
use crate::errors::PipelineError;
use crate::plan::{Materializer, PipelinePlan};
use crate::sync::{CompletionBarrier, Latch, ThreadPool};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub(crate) struct WorkerFailure {
    pub(crate) stage: usize,
    pub(crate) message: String,
}

pub(crate) struct ExecutionShared {
    pub(crate) id: Uuid,
    pub(crate) start: Latch,
    pub(crate) end: Latch,
    pub(crate) done: AtomicBool,
    pub(crate) failure: Mutex<Option<WorkerFailure>>,
    pub(crate) token: Arc<CancellationToken>,
    pub(crate) user_cancelled: AtomicBool,
}

/// A running pipeline.
///
/// Starting an execution materializes the plan into one runnable filter per
/// segment, fixes the thread-end barrier at exactly that worker count,
/// submits the workers, and releases them together through the start latch.
/// The handle does not block on drop; [`wait`](Self::wait) is the join
/// point.
pub struct PipelineExecution {
    shared: Arc<ExecutionShared>,
    num_workers: usize,
}

impl PipelineExecution {
    /// Materializes `plan` and starts one worker per segment on `pool`.
    ///
    /// The plan is only borrowed: each start builds fresh filter instances
    /// and fresh boundary queues, so the same plan value can be started any
    /// number of times, concurrently or not.
    #[must_use]
    pub fn start(plan: &PipelinePlan, pool: &ThreadPool) -> Self {
        let id = Uuid::new_v4();
        let token = Arc::new(CancellationToken::new());
        let mut cx = Materializer::new(Arc::clone(&token));
        let filters = plan.materialize(&mut cx);
        drop(cx);
        let num_workers = filters.len();

        let shared = Arc::new(ExecutionShared {
            id,
            start: Latch::new(1),
            end: Latch::new(1),
            done: AtomicBool::new(false),
            failure: Mutex::new(None),
            token,
            user_cancelled: AtomicBool::new(false),
        });

        // The barrier capacity is fixed before any worker is released.
        let completion = Arc::clone(&shared);
        let thread_end = Arc::new(CompletionBarrier::new(num_workers, move || {
            completion.done.store(true, Ordering::SeqCst);
            completion.end.count_down();
        }));

        debug!(execution = %id, workers = num_workers, "starting pipeline execution");
        for (stage, filter) in filters.into_iter().enumerate() {
            let shared = Arc::clone(&shared);
            let thread_end = Arc::clone(&thread_end);
            pool.try_get_unused_thread()
                .execute(move || worker::run_worker(&shared, &thread_end, &filter, stage));
        }
        shared.start.count_down();

        Self {
            shared,
            num_workers,
        }
    }

    /// Blocks until every worker has finished its close phase.
    ///
    /// Returns `Ok(())` on a clean drain, [`PipelineError::Cancelled`] if
    /// [`cancel`](Self::cancel) was called before completion, and
    /// [`PipelineError::WorkerFailed`] with the first observed cause if a
    /// worker panicked.
    pub fn wait(&self) -> Result<(), PipelineError> {
        self.shared.end.wait();
        if self.shared.user_cancelled.load(Ordering::SeqCst) {
            return Err(PipelineError::Cancelled {
                reason: self
                    .shared
                    .token
                    .reason()
                    .unwrap_or_else(|| "cancelled".to_string()),
            });
        }
        if let Some(failure) = self.shared.failure.lock().as_ref() {
            return Err(PipelineError::WorkerFailed {
                stage: failure.stage,
                message: failure.message.clone(),
            });
        }
        Ok(())
    }

    /// Non-blocking check: has every worker finished?
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.shared.done.load(Ordering::SeqCst)
    }

    /// Requests cooperative cancellation with drop-and-exit semantics.
    ///
    /// Workers stop between driver steps without draining remaining items,
    /// boundary queues are closed, and blocked workers are woken. Queues
    /// owned by the embedder are woken but left open; a worker blocked
    /// pushing into an external queue stays blocked until the embedder
    /// drains or closes it. A no-op once the execution is done.
    pub fn cancel(&self, reason: impl Into<String>) {
        if self.is_done() {
            return;
        }
        self.shared.user_cancelled.store(true, Ordering::SeqCst);
        let reason = reason.into();
        debug!(execution = %self.shared.id, reason = %reason, "cancelling pipeline execution");
        self.shared.token.cancel(reason);
    }

    /// Number of worker threads this execution occupies.
    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Unique id of this execution, as used in its log events.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.shared.id
    }
}
