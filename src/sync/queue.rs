//! Bounded multi-producer/multi-consumer queue with a closeable producer side.

use crate::cancellation::CancellationToken;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Creates a bounded queue of the given capacity and returns its two ends.
///
/// Both handles refer to the same queue and may be cloned freely; cloning a
/// handle never duplicates the queue or its contents.
#[must_use]
pub fn bounded<T>(capacity: NonZeroUsize) -> (QueueWriter<T>, QueueReader<T>) {
    let queue = Arc::new(BoundedQueue::with_capacity(capacity));
    (
        QueueWriter {
            queue: Arc::clone(&queue),
        },
        QueueReader { queue },
    )
}

/// The outcome of a blocking pop.
#[derive(Debug)]
pub enum Pop<T> {
    /// An item was dequeued.
    Item(T),
    /// The queue is closed and fully drained.
    Closed,
    /// The cancellation token tripped while waiting (or before draining).
    Cancelled,
}

/// The outcome of a token-aware blocking push.
#[derive(Debug)]
pub enum Push<T> {
    /// The item was enqueued.
    Pushed,
    /// The queue was closed; the item is handed back.
    Closed(T),
    /// The cancellation token tripped; the item is handed back.
    Cancelled(T),
}

/// Error returned when pushing into a closed queue; carries the rejected item.
pub struct PushError<T>(pub T);

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PushError(..)")
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("pushing into a closed queue")
    }
}

impl<T> std::error::Error for PushError<T> {}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// A bounded FIFO queue shared by exactly one producer stage and one
/// consumer stage of a pipeline (or by an embedder feeding/draining it).
///
/// `push` blocks while the queue is full; `wait_pop` blocks while it is
/// empty. Closing is a monotonic, idempotent transition that wakes every
/// waiter: subsequent pushes fail, and pops drain the remaining items
/// before reporting closed.
pub struct BoundedQueue<T> {
    capacity: usize,
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    #[must_use]
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: capacity.get(),
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity.get()),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Enqueues `value`, blocking while the queue is full.
    pub fn push(&self, value: T) -> Result<(), PushError<T>> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(PushError(value));
            }
            if state.items.len() < self.capacity {
                state.items.push_back(value);
                drop(state);
                self.not_empty.notify_one();
                return Ok(());
            }
            self.not_full.wait(&mut state);
        }
    }

    /// Token-aware variant of [`push`](Self::push).
    ///
    /// Returns the item on either failure arm so the caller decides whether
    /// dropping it is acceptable.
    pub fn push_with(&self, value: T, token: &CancellationToken) -> Push<T> {
        let mut state = self.state.lock();
        loop {
            if token.is_cancelled() {
                return Push::Cancelled(value);
            }
            if state.closed {
                return Push::Closed(value);
            }
            if state.items.len() < self.capacity {
                state.items.push_back(value);
                drop(state);
                self.not_empty.notify_one();
                return Push::Pushed;
            }
            self.not_full.wait(&mut state);
        }
    }

    /// Dequeues one item, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn wait_pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(value) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(value);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Token-aware variant of [`wait_pop`](Self::wait_pop).
    ///
    /// A tripped token takes precedence over remaining items: a cancelled
    /// pipeline exits without draining.
    pub fn pop_with(&self, token: &CancellationToken) -> Pop<T> {
        let mut state = self.state.lock();
        loop {
            if token.is_cancelled() {
                return Pop::Cancelled;
            }
            if let Some(value) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Pop::Item(value);
            }
            if state.closed {
                return Pop::Closed;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Dequeues one item without blocking.
    pub fn try_pop(&self) -> Option<T> {
        let value = self.state.lock().items.pop_front();
        if value.is_some() {
            self.not_full.notify_one();
        }
        value
    }

    /// Closes the producer side. Monotonic and idempotent; wakes all waiters.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Wakes every blocked producer and consumer without changing state.
    ///
    /// Paired with a freshly observable condition (a tripped cancellation
    /// token); a waiter that finds nothing changed goes back to sleep.
    pub fn wake_all(&self) {
        drop(self.state.lock());
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Returns whether the producer side is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns the number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Returns whether the queue is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Returns the fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Producer handle of a [`BoundedQueue`].
pub struct QueueWriter<T> {
    queue: Arc<BoundedQueue<T>>,
}

impl<T> Clone for QueueWriter<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<T> QueueWriter<T> {
    /// Enqueues `value`, blocking while the queue is full.
    pub fn push(&self, value: T) -> Result<(), PushError<T>> {
        self.queue.push(value)
    }

    /// Token-aware variant of [`push`](Self::push).
    pub fn push_with(&self, value: T, token: &CancellationToken) -> Push<T> {
        self.queue.push_with(value, token)
    }

    /// Closes the producer side of the queue.
    pub fn close(&self) {
        self.queue.close();
    }

    /// Returns whether the queue is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Returns the number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether the queue is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Consumer handle of a [`BoundedQueue`].
pub struct QueueReader<T> {
    queue: Arc<BoundedQueue<T>>,
}

impl<T> Clone for QueueReader<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<T> QueueReader<T> {
    /// Dequeues one item, blocking while the queue is empty; `None` once
    /// the queue is closed and drained.
    pub fn wait_pop(&self) -> Option<T> {
        self.queue.wait_pop()
    }

    /// Token-aware variant of [`wait_pop`](Self::wait_pop).
    pub fn pop_with(&self, token: &CancellationToken) -> Pop<T> {
        self.queue.pop_with(token)
    }

    /// Dequeues one item without blocking.
    pub fn try_pop(&self) -> Option<T> {
        self.queue.try_pop()
    }

    /// Returns whether the queue is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Returns the number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether the queue is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn shared(&self) -> &Arc<BoundedQueue<T>> {
        &self.queue
    }
}
