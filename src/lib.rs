//! # Pipeflow
//!
//! A typed streaming dataflow library: describe a computation as a
//! composition of stages, connect the stages with the pipe operator, and
//! execute the whole graph on a pool of worker threads.
//!
//! Pipeflow provides:
//!
//! - **Typed composition**: stages are `input -> output` transforms; the
//!   pipe operator only accepts stages whose types line up, and only a
//!   fully closed plan can be executed
//! - **Explicit thread boundaries**: `parallel` is the single construct
//!   that moves work onto another thread, bridged by a bounded queue
//! - **Lock-step lifecycle**: workers start together, drain deterministically
//!   as upstream queues close, and completion is observed through one handle
//! - **Cooperative cancellation**: a drop-and-exit token that wakes blocked
//!   workers and still runs every close callback
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipeflow::prelude::*;
//! use std::num::NonZeroUsize;
//!
//! let capacity = NonZeroUsize::new(8).unwrap();
//! let (in_tx, in_rx) = bounded::<i64>(capacity);
//! let (out_tx, out_rx) = bounded::<i64>(capacity);
//!
//! // Two worker threads: the source/feeder segment and the doubling stage.
//! let plan = source(in_rx)
//!     | parallel(filter(|x: i64| x * 2))
//!     | sink_and_close(out_tx);
//!
//! let pool = ThreadPool::new();
//! let exec = PipelineExecution::start(&plan, &pool);
//!
//! for x in 0..3 {
//!     in_tx.push(x)?;
//! }
//! in_tx.close();
//!
//! exec.wait()?;
//! while let Some(x) = out_rx.wait_pop() {
//!     println!("{x}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod errors;
pub mod execution;
pub mod filter;
pub mod plan;
pub mod sync;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::errors::PipelineError;
    pub use crate::execution::PipelineExecution;
    pub use crate::filter::Term;
    pub use crate::plan::{
        consume, consume_with_close, filter, parallel, parallel_sized, sink, sink_and_close,
        source, FullPlan, PipelinePlan, SimplePlan, DEFAULT_QUEUE_CAPACITY,
    };
    pub use crate::sync::{
        bounded, BoundedQueue, CompletionBarrier, Latch, PoolThread, Pop, Push, PushError,
        QueueReader, QueueWriter, ThreadPool,
    };
}
