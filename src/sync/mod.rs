//! Concurrency primitives the pipeline runtime is built on.
//!
//! These are the collaborators every execution leans on: a bounded
//! closeable queue for crossing thread boundaries, a count-down latch for
//! the lock-step start, a reusable barrier with an on-completion callback
//! for the coordinated stop, and a small pool of cached worker threads.

mod barrier;
mod latch;
mod pool;
mod queue;

pub use barrier::CompletionBarrier;
pub use latch::Latch;
pub use pool::{PoolThread, ThreadPool};
pub use queue::{bounded, BoundedQueue, Pop, Push, PushError, QueueReader, QueueWriter};
