//! Driver-mode filters: the queue-fed stages worker threads run.

use super::transform::{Closer, Transform};
use crate::cancellation::CancellationToken;
use crate::sync::{BoundedQueue, Pop};
use std::sync::Arc;

/// Result of one driver step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    /// An item was processed; more may follow.
    More,
    /// The upstream queue is closed and drained.
    Drained,
    /// The execution's cancellation token tripped.
    Cancelled,
}

type PullFn<O> = Box<dyn Fn(&mut dyn FnMut(O)) -> StepOutcome + Send>;

/// A runnable filter rooted at the consumer side of a queue, producing `O`.
///
/// One driver step pops a single item (blocking while the queue is empty),
/// funnels it through any fused downstream transforms, and hands the result
/// to the caller's continuation.
pub(crate) struct SourceFilter<O> {
    pull: PullFn<O>,
    closers: Vec<Closer>,
}

impl<O> SourceFilter<O>
where
    O: Send + 'static,
{
    /// A source filter reading directly from `queue`.
    pub(crate) fn from_queue(
        queue: Arc<BoundedQueue<O>>,
        token: Arc<CancellationToken>,
    ) -> Self {
        Self {
            pull: Box::new(move |out: &mut dyn FnMut(O)| match queue.pop_with(&token) {
                Pop::Item(item) => {
                    out(item);
                    StepOutcome::More
                }
                Pop::Closed => StepOutcome::Drained,
                Pop::Cancelled => StepOutcome::Cancelled,
            }),
            closers: Vec::new(),
        }
    }

    /// Extends the filter with a downstream transform, composing inside the
    /// continuation so one driver step still moves exactly one item.
    pub(crate) fn then_transform<P>(self, next: Transform<O, P>) -> SourceFilter<P>
    where
        P: Send + 'static,
    {
        let pull = self.pull;
        let func = Arc::clone(&next.func);
        let mut closers = self.closers;
        closers.extend(next.closers);
        SourceFilter {
            pull: Box::new(move |out: &mut dyn FnMut(P)| {
                pull(&mut |item| out(func(item)))
            }),
            closers,
        }
    }

    /// Seals the filter into the `Term -> Term` shape a worker drives,
    /// discarding its output values.
    pub(crate) fn into_runnable(self) -> RunnableFilter {
        let pull = self.pull;
        RunnableFilter {
            step: Box::new(move || pull(&mut |_item| {})),
            closers: self.closers,
        }
    }
}

type StepFn = Box<dyn Fn() -> StepOutcome + Send>;

/// A fully sealed pipeline segment: one driver step plus its close phase.
/// Each materialized instance is driven by exactly one worker thread.
pub(crate) struct RunnableFilter {
    step: StepFn,
    closers: Vec<Closer>,
}

impl RunnableFilter {
    /// Runs one driver step.
    pub(crate) fn step(&self) -> StepOutcome {
        (self.step)()
    }

    /// Runs the close phase, upstream first.
    pub(crate) fn close(&self) {
        for closer in &self.closers {
            closer();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Term;
    use std::num::NonZeroUsize;

    fn queue_of(items: &[i32], close: bool) -> Arc<BoundedQueue<i32>> {
        let queue = Arc::new(BoundedQueue::with_capacity(NonZeroUsize::new(16).unwrap()));
        for &item in items {
            queue.push(item).unwrap();
        }
        if close {
            queue.close();
        }
        queue
    }

    #[test]
    fn test_source_drains_then_reports_closed() {
        let token = Arc::new(CancellationToken::new());
        let source = SourceFilter::from_queue(queue_of(&[1, 2], true), token);
        let mut seen = Vec::new();
        assert_eq!((source.pull)(&mut |item| seen.push(item)), StepOutcome::More);
        assert_eq!((source.pull)(&mut |item| seen.push(item)), StepOutcome::More);
        assert_eq!(
            (source.pull)(&mut |item| seen.push(item)),
            StepOutcome::Drained
        );
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_source_observes_cancellation() {
        let token = Arc::new(CancellationToken::new());
        token.cancel("test");
        let source = SourceFilter::from_queue(queue_of(&[1], false), token);
        let mut sink = |_item: i32| {};
        assert_eq!((source.pull)(&mut sink), StepOutcome::Cancelled);
    }

    #[test]
    fn test_then_transform_moves_one_item_per_step() {
        let token = Arc::new(CancellationToken::new());
        let source = SourceFilter::from_queue(queue_of(&[10, 20], true), token)
            .then_transform(Transform::new(|x: i32| x + 1));
        let mut seen = Vec::new();
        assert_eq!((source.pull)(&mut |item| seen.push(item)), StepOutcome::More);
        assert_eq!(seen, vec![11]);
        assert_eq!((source.pull)(&mut |item| seen.push(item)), StepOutcome::More);
        assert_eq!(
            (source.pull)(&mut |item| seen.push(item)),
            StepOutcome::Drained
        );
        assert_eq!(seen, vec![11, 21]);
    }

    #[test]
    fn test_into_runnable_drives_to_completion() {
        let token = Arc::new(CancellationToken::new());
        let runnable = SourceFilter::from_queue(queue_of(&[1, 2, 3], true), token)
            .then_transform(Transform::<i32, Term>::discard())
            .into_runnable();
        assert_eq!(runnable.step(), StepOutcome::More);
        assert_eq!(runnable.step(), StepOutcome::More);
        assert_eq!(runnable.step(), StepOutcome::More);
        assert_eq!(runnable.step(), StepOutcome::Drained);
    }
}
