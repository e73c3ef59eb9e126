//! Reusable barrier with an on-completion callback.

use parking_lot::{Condvar, Mutex};

struct BarrierState {
    remaining: usize,
    generation: u64,
}

/// A reusable barrier for a fixed number of parties.
///
/// The last party to arrive runs the on-completion callback before anyone
/// is released, then opens the next generation.
pub struct CompletionBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
    on_complete: Box<dyn Fn() + Send + Sync>,
}

impl CompletionBarrier {
    /// Creates a barrier for `parties` threads with a completion callback.
    ///
    /// # Panics
    ///
    /// Panics if `parties` is zero.
    #[must_use]
    pub fn new<F>(parties: usize, on_complete: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        assert!(parties > 0, "barrier requires at least one party");
        Self {
            parties,
            state: Mutex::new(BarrierState {
                remaining: parties,
                generation: 0,
            }),
            released: Condvar::new(),
            on_complete: Box::new(on_complete),
        }
    }

    /// Arrives at the barrier and blocks until every party of this
    /// generation has arrived.
    pub fn count_down_and_wait(&self) {
        let mut state = self.state.lock();
        let generation = state.generation;
        state.remaining -= 1;
        if state.remaining == 0 {
            (self.on_complete)();
            state.remaining = self.parties;
            state.generation = state.generation.wrapping_add(1);
            drop(state);
            self.released.notify_all();
            return;
        }
        while state.generation == generation {
            self.released.wait(&mut state);
        }
    }

    /// Returns the number of parties per generation.
    #[must_use]
    pub fn parties(&self) -> usize {
        self.parties
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_callback_runs_once_before_release() {
        let fired = Arc::new(AtomicUsize::new(0));
        let observer = Arc::clone(&fired);
        let barrier = Arc::new(CompletionBarrier::new(3, move || {
            observer.fetch_add(1, Ordering::SeqCst);
        }));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                let fired = Arc::clone(&fired);
                thread::spawn(move || {
                    barrier.count_down_and_wait();
                    // Release implies the callback already ran.
                    assert_eq!(fired.load(Ordering::SeqCst), 1);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_barrier_is_reusable() {
        let fired = Arc::new(AtomicUsize::new(0));
        let observer = Arc::clone(&fired);
        let barrier = Arc::new(CompletionBarrier::new(2, move || {
            observer.fetch_add(1, Ordering::SeqCst);
        }));

        for _ in 0..2 {
            let partner = Arc::clone(&barrier);
            let handle = thread::spawn(move || partner.count_down_and_wait());
            barrier.count_down_and_wait();
            handle.join().unwrap();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_single_party_never_blocks() {
        let barrier = CompletionBarrier::new(1, || {});
        barrier.count_down_and_wait();
        barrier.count_down_and_wait();
        assert_eq!(barrier.parties(), 1);
    }
}
