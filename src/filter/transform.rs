//! Apply-mode filters: a pure function plus ordered close callbacks.

use super::Term;
use std::sync::Arc;

/// A close callback, invoked exactly once per execution by the worker that
/// drove the owning stage.
pub(crate) type Closer = Arc<dyn Fn() + Send + Sync>;

/// A transform filter `I -> O`.
///
/// Chaining fuses the functions into a single captured composition, so a
/// run of adjacent transforms costs one closure call per hop and no
/// dispatch table. Close callbacks accumulate in pipeline order.
pub(crate) struct Transform<I, O> {
    pub(crate) func: Arc<dyn Fn(I) -> O + Send + Sync>,
    pub(crate) closers: Vec<Closer>,
}

impl<I, O> Clone for Transform<I, O> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            closers: self.closers.clone(),
        }
    }
}

impl<I, O> Transform<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub(crate) fn new<F>(func: F) -> Self
    where
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            closers: Vec::new(),
        }
    }

    pub(crate) fn with_close<F, C>(func: F, close: C) -> Self
    where
        F: Fn(I) -> O + Send + Sync + 'static,
        C: Fn() + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            closers: vec![Arc::new(close)],
        }
    }

    pub(crate) fn apply(&self, input: I) -> O {
        (self.func)(input)
    }

    /// Fuses `self` with a downstream transform.
    pub(crate) fn then<P>(self, next: Transform<O, P>) -> Transform<I, P>
    where
        P: Send + 'static,
    {
        let first = self.func;
        let second = next.func;
        let mut closers = self.closers;
        closers.extend(next.closers);
        Transform {
            func: Arc::new(move |input| second(first(input))),
            closers,
        }
    }
}

impl<I> Transform<I, Term>
where
    I: Send + 'static,
{
    /// A transform that swallows its input.
    ///
    /// Used as the terminal step when composing onto a self-sourced plan,
    /// whose input type is `Term` by construction.
    pub(crate) fn discard() -> Self {
        Self::new(|_input| Term)
    }
}
