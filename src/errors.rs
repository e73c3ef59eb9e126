//! Error types for the pipeflow library.

use thiserror::Error;

/// The error surfaced by a pipeline execution handle.
///
/// Construction-time mistakes (ill-typed composition, executing a plan that
/// still has open ends) are rejected by the compiler and never reach this
/// type; what remains is what can go wrong while worker threads are running.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// The execution was cancelled before every stage drained.
    #[error("pipeline cancelled: {reason}")]
    Cancelled {
        /// The reason passed to `cancel`, first one wins.
        reason: String,
    },

    /// A worker thread failed while driving its stage.
    ///
    /// Only the first observed cause is kept; later failures during the
    /// resulting teardown are suppressed.
    #[error("worker for stage {stage} failed: {message}")]
    WorkerFailed {
        /// Index of the failing stage, in pipeline order.
        stage: usize,
        /// The captured panic message.
        message: String,
    },
}
