//! The cancellation flag an execution shares with its worker threads.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

type WakeFn = Box<dyn Fn() + Send + Sync>;

struct TokenState {
    reason: Option<String>,
    wakers: Vec<WakeFn>,
}

/// Cooperative cancellation with drop-and-exit semantics.
///
/// Tripping the token is one-way and keeps only the first reason. Workers
/// poll it between driver steps, and the token-aware queue operations
/// re-check it under the queue lock whenever they are woken. The wake hooks
/// registered at materialization (closing a boundary queue, waking an
/// external one) are what get those sleepers out of their condvars; they
/// run once, on the thread that trips the token.
pub struct CancellationToken {
    cancelled: AtomicBool,
    state: Mutex<TokenState>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// Creates a token in the clear state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            state: Mutex::new(TokenState {
                reason: None,
                wakers: Vec::new(),
            }),
        }
    }

    /// Trips the token, keeping the first reason, and runs the registered
    /// wake hooks. Later calls change nothing.
    pub fn cancel(&self, reason: impl Into<String>) {
        let wakers = {
            let mut state = self.state.lock();
            if self.cancelled.swap(true, Ordering::SeqCst) {
                return;
            }
            state.reason = Some(reason.into());
            std::mem::take(&mut state.wakers)
        };
        for wake in &wakers {
            wake();
        }
    }

    /// Registers a hook that wakes a blocked pipeline stage.
    ///
    /// Hooks run once when the token trips; registering on an already
    /// tripped token runs the hook right away.
    pub(crate) fn register_wake<F>(&self, wake: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        {
            let mut state = self.state.lock();
            if !self.cancelled.load(Ordering::SeqCst) {
                state.wakers.push(Box::new(wake));
                return;
            }
        }
        wake();
    }

    /// Returns whether the token has been tripped.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the first cancellation reason, if the token has tripped.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.state.lock().reason.clone()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.state.lock().reason)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{bounded, Pop};
    use std::num::NonZeroUsize;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_starts_clear() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
    }

    #[test]
    fn test_first_reason_wins() {
        let token = CancellationToken::new();
        token.cancel("queue stalled");
        token.cancel("operator request");

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some("queue stalled".to_string()));
    }

    #[test]
    fn test_wake_hooks_run_once_on_first_trip() {
        let token = CancellationToken::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        token.register_wake(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(wakes.load(Ordering::SeqCst), 0);
        token.cancel("first");
        token.cancel("second");
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_late_registration_runs_hook_immediately() {
        let token = CancellationToken::new();
        token.cancel("already down");

        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        token.register_wake(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(wakes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_trip_wakes_a_blocked_consumer() {
        let (tx, rx) = bounded::<i32>(NonZeroUsize::new(2).unwrap());
        let token = Arc::new(CancellationToken::new());

        let queue = Arc::clone(rx.shared());
        token.register_wake(move || queue.wake_all());

        let waiter_token = Arc::clone(&token);
        let waiter = thread::spawn(move || rx.pop_with(&waiter_token));

        thread::sleep(Duration::from_millis(20));
        token.cancel("tearing down");

        assert!(matches!(waiter.join().unwrap(), Pop::Cancelled));
        drop(tx);
    }
}
