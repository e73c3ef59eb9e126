//! Thread-boundary slots and their per-execution materialization.

use crate::cancellation::CancellationToken;
use crate::sync::BoundedQueue;
use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(0);

/// A placeholder for the bounded queue a `parallel` boundary will need.
///
/// The slot carries everything known at composition time (item type,
/// capacity, identity) while the queue itself is created per execution, so
/// two concurrent executions of the same plan value never share a boundary.
/// The sink half and source half of one boundary hold the same slot and
/// therefore resolve to the same queue within one execution.
pub(crate) struct BoundarySlot<T> {
    id: u64,
    capacity: NonZeroUsize,
    _item: PhantomData<fn() -> T>,
}

impl<T> BoundarySlot<T> {
    pub(crate) fn new(capacity: NonZeroUsize) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed),
            capacity,
            _item: PhantomData,
        })
    }
}

/// Per-execution build context.
///
/// Resolves boundary slots to live queues and wires every queue an
/// execution can block on into the cancellation token, so `cancel` can wake
/// the sleepers.
pub(crate) struct Materializer {
    token: Arc<CancellationToken>,
    queues: HashMap<u64, Arc<dyn Any + Send + Sync>>,
}

impl Materializer {
    pub(crate) fn new(token: Arc<CancellationToken>) -> Self {
        Self {
            token,
            queues: HashMap::new(),
        }
    }

    /// The execution's cancellation token.
    pub(crate) fn token(&self) -> Arc<CancellationToken> {
        Arc::clone(&self.token)
    }

    /// Resolves `slot` to this execution's queue, instantiating it on first
    /// use. Boundary queues are closed outright on cancellation; that both
    /// wakes their waiters and fails later pushes.
    pub(crate) fn queue<T>(&mut self, slot: &BoundarySlot<T>) -> Arc<BoundedQueue<T>>
    where
        T: Send + 'static,
    {
        if let Some(existing) = self.queues.get(&slot.id) {
            return match Arc::clone(existing).downcast::<BoundedQueue<T>>() {
                Ok(queue) => queue,
                Err(_) => unreachable!("boundary slot resolved to a different item type"),
            };
        }
        let queue = Arc::new(BoundedQueue::<T>::with_capacity(slot.capacity));
        let hook = Arc::clone(&queue);
        self.token.register_wake(move || hook.close());
        self.queues
            .insert(slot.id, Arc::clone(&queue) as Arc<dyn Any + Send + Sync>);
        queue
    }

    /// Wires an externally owned queue into cancellation: waiters are woken
    /// but the queue is left open, it does not belong to this execution.
    pub(crate) fn wake_on_cancel<T>(&self, queue: &Arc<BoundedQueue<T>>)
    where
        T: Send + 'static,
    {
        let hook = Arc::clone(queue);
        self.token.register_wake(move || hook.wake_all());
    }
}
