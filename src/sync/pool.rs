//! A small pool of cached OS worker threads.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

type Task = Box<dyn FnOnce() + Send + 'static>;

enum SlotState {
    Idle,
    Ready(Task),
    Exit,
}

struct WorkerSlot {
    state: Mutex<SlotState>,
    wake: Condvar,
}

struct PoolShared {
    idle: Mutex<Vec<Arc<WorkerSlot>>>,
    shutdown: AtomicBool,
}

/// A pool that hands out dedicated worker threads one task at a time.
///
/// Threads are spawned on demand and cached when their task finishes.
/// Dropping the pool tells idle threads to exit; a thread still running a
/// task finishes it and then exits instead of returning to the cache.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(PoolShared {
                idle: Mutex::new(Vec::new()),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// Returns a handle to an unused worker thread, spawning one if the
    /// cache is empty.
    #[must_use]
    pub fn try_get_unused_thread(&self) -> PoolThread {
        if let Some(slot) = self.shared.idle.lock().pop() {
            return PoolThread { slot };
        }
        self.spawn_worker()
    }

    /// Returns the number of cached idle threads.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.shared.idle.lock().len()
    }

    fn spawn_worker(&self) -> PoolThread {
        let slot = Arc::new(WorkerSlot {
            state: Mutex::new(SlotState::Idle),
            wake: Condvar::new(),
        });
        let shared = Arc::clone(&self.shared);
        let worker = Arc::clone(&slot);
        debug!("spawning pool worker thread");
        std::thread::Builder::new()
            .name("pipeflow-worker".to_string())
            .spawn(move || worker_loop(&shared, &worker))
            .expect("failed to spawn pool worker thread");
        PoolThread { slot }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        let slots: Vec<_> = self.shared.idle.lock().drain(..).collect();
        for slot in slots {
            *slot.state.lock() = SlotState::Exit;
            slot.wake.notify_one();
        }
    }
}

/// A claimed worker thread, ready to run exactly one task.
pub struct PoolThread {
    slot: Arc<WorkerSlot>,
}

impl PoolThread {
    /// Runs `task` on the claimed thread.
    pub fn execute<F>(self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.slot.state.lock();
            *state = SlotState::Ready(Box::new(task));
        }
        self.slot.wake.notify_one();
    }
}

fn worker_loop(shared: &Arc<PoolShared>, slot: &Arc<WorkerSlot>) {
    loop {
        let task = {
            let mut state = slot.state.lock();
            loop {
                match std::mem::replace(&mut *state, SlotState::Idle) {
                    SlotState::Ready(task) => break task,
                    SlotState::Exit => return,
                    SlotState::Idle => slot.wake.wait(&mut state),
                }
            }
        };
        task();
        // Re-register under the idle lock so shutdown cannot miss us.
        let mut idle = shared.idle.lock();
        if shared.shutdown.load(Ordering::SeqCst) {
            return;
        }
        idle.push(Arc::clone(slot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::Latch;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_executes_a_task() {
        let pool = ThreadPool::new();
        let done = Arc::new(Latch::new(1));
        let signal = Arc::clone(&done);
        pool.try_get_unused_thread().execute(move || {
            signal.count_down();
        });
        done.wait();
    }

    #[test]
    fn test_executes_many_tasks() {
        let pool = ThreadPool::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(Latch::new(8));
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            let done = Arc::clone(&done);
            pool.try_get_unused_thread().execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                done.count_down();
            });
        }
        done.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_idle_thread_is_reused() {
        let pool = ThreadPool::new();
        let done = Arc::new(Latch::new(1));
        let signal = Arc::clone(&done);
        pool.try_get_unused_thread().execute(move || {
            signal.count_down();
        });
        done.wait();

        // The worker re-registers shortly after its task returns.
        for _ in 0..50 {
            if pool.idle_count() == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(pool.idle_count(), 1);

        let done = Arc::new(Latch::new(1));
        let signal = Arc::clone(&done);
        pool.try_get_unused_thread().execute(move || {
            signal.count_down();
        });
        done.wait();
    }
}
