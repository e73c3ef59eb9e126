//! The per-thread driver protocol.

use super::{ExecutionShared, WorkerFailure};
use crate::filter::{RunnableFilter, StepOutcome};
use crate::sync::CompletionBarrier;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Drives one pipeline segment to completion.
///
/// Every worker follows the same shape: wait for the collective start, loop
/// the driver step until the upstream drains (or cancellation trips), run
/// the close phase exactly once, and arrive at the thread-end barrier. The
/// close phase runs on every exit path, panics included, so the closed
/// state keeps propagating downstream and the remaining workers can drain.
pub(crate) fn run_worker(
    shared: &Arc<ExecutionShared>,
    thread_end: &Arc<CompletionBarrier>,
    filter: &RunnableFilter,
    stage: usize,
) {
    shared.start.wait();

    match catch_unwind(AssertUnwindSafe(|| drive(filter))) {
        Ok(StepOutcome::Drained) => {
            debug!(execution = %shared.id, stage, "worker drained");
        }
        Ok(StepOutcome::Cancelled) => {
            debug!(execution = %shared.id, stage, "worker cancelled");
        }
        Ok(StepOutcome::More) => unreachable!("driver loop exited while more input was pending"),
        Err(payload) => record_failure(shared, stage, &payload),
    }

    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| filter.close())) {
        record_failure(shared, stage, &payload);
    }

    thread_end.count_down_and_wait();
}

fn drive(filter: &RunnableFilter) -> StepOutcome {
    loop {
        match filter.step() {
            StepOutcome::More => {}
            outcome => return outcome,
        }
    }
}

/// Keeps the first observed cause and tears the rest of the pipeline down
/// through the cancellation token, so no surviving worker blocks forever on
/// a queue whose peer is gone.
fn record_failure(shared: &Arc<ExecutionShared>, stage: usize, payload: &(dyn Any + Send)) {
    let message = panic_message(payload);
    warn!(execution = %shared.id, stage, message = %message, "worker failed");
    {
        let mut failure = shared.failure.lock();
        if failure.is_none() {
            *failure = Some(WorkerFailure { stage, message });
        }
    }
    shared
        .token
        .cancel(format!("worker for stage {stage} failed"));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked with a non-string payload".to_string()
    }
}
