//! Count-down latch used for the lock-step start and final release.

use parking_lot::{Condvar, Mutex};

/// A single-use count-down latch.
///
/// The count only moves toward zero; once it gets there every current and
/// future waiter is released.
pub struct Latch {
    count: Mutex<usize>,
    released: Condvar,
}

impl Latch {
    /// Creates a latch with the given initial count.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            released: Condvar::new(),
        }
    }

    /// Decrements the count, releasing all waiters when it reaches zero.
    ///
    /// Decrementing an already-released latch is a no-op.
    pub fn count_down(&self) {
        let mut count = self.count.lock();
        if *count == 0 {
            return;
        }
        *count -= 1;
        if *count == 0 {
            drop(count);
            self.released.notify_all();
        }
    }

    /// Blocks until the count reaches zero.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.released.wait(&mut count);
        }
    }

    /// Returns the current count.
    #[must_use]
    pub fn count(&self) -> usize {
        *self.count.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_two_threads_wait_for_count_down() {
        let latch = Arc::new(Latch::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let latch = Arc::clone(&latch);
                thread::spawn(move || {
                    latch.wait();
                    assert_eq!(latch.count(), 0);
                })
            })
            .collect();
        latch.count_down();
        latch.count_down();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_wait_on_pre_decremented_latch() {
        let latch = Arc::new(Latch::new(2));
        latch.count_down();
        latch.count_down();
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let latch = Arc::clone(&latch);
                thread::spawn(move || latch.wait())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_two_threads_two_latches() {
        let first = Arc::new(Latch::new(1));
        let second = Arc::new(Latch::new(1));

        let (f1, s1) = (Arc::clone(&first), Arc::clone(&second));
        let waiter = thread::spawn(move || {
            f1.wait();
            s1.count_down();
            assert_eq!(f1.count(), 0);
            assert_eq!(s1.count(), 0);
        });

        let (f2, s2) = (Arc::clone(&first), Arc::clone(&second));
        let releaser = thread::spawn(move || {
            f2.count_down();
            s2.wait();
            assert_eq!(f2.count(), 0);
            assert_eq!(s2.count(), 0);
        });

        waiter.join().unwrap();
        releaser.join().unwrap();
    }

    #[test]
    fn test_count_down_saturates_at_zero() {
        let latch = Latch::new(1);
        latch.count_down();
        latch.count_down();
        assert_eq!(latch.count(), 0);
    }
}
