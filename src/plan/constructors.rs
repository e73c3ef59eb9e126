//! Stage constructors: the user-facing vocabulary for building plans.

use super::boundary::BoundarySlot;
use super::full::{FullPlan, LeadingBuilder, TrailingBuilder};
use super::simple::SimplePlan;
use crate::cancellation::CancellationToken;
use crate::filter::{SourceFilter, Term, Transform};
use crate::sync::{BoundedQueue, Push, QueueReader, QueueWriter};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Capacity of the bounded queue a [`parallel`] boundary allocates when no
/// explicit capacity is given.
pub const DEFAULT_QUEUE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(16) {
    Some(n) => n,
    None => panic!("default capacity must be non-zero"),
};

/// A transform stage applying `func` to every item.
pub fn filter<I, O, F>(func: F) -> SimplePlan<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> O + Send + Sync + 'static,
{
    SimplePlan::from_transform(Transform::new(func))
}

/// A terminal stage handing every item to `func`.
pub fn consume<I, F>(func: F) -> SimplePlan<I, Term>
where
    I: Send + 'static,
    F: Fn(I) + Send + Sync + 'static,
{
    SimplePlan::from_transform(Transform::new(move |input| {
        func(input);
        Term
    }))
}

/// A terminal stage with a close callback, invoked once after the stage's
/// last item.
pub fn consume_with_close<I, F, C>(func: F, close: C) -> SimplePlan<I, Term>
where
    I: Send + 'static,
    F: Fn(I) + Send + Sync + 'static,
    C: Fn() + Send + Sync + 'static,
{
    SimplePlan::from_transform(Transform::with_close(
        move |input| {
            func(input);
            Term
        },
        close,
    ))
}

/// A terminal stage pushing every item into `writer`'s queue.
///
/// The queue stays open when the stage closes; use [`sink_and_close`] to
/// propagate completion downstream.
pub fn sink<I>(writer: QueueWriter<I>) -> SimplePlan<I, Term>
where
    I: Send + 'static,
{
    consume(move |input| push_or_fail(&writer, input))
}

/// Like [`sink`], but the stage's close callback also closes the queue's
/// producer side, letting a downstream consumer observe completion.
pub fn sink_and_close<I>(writer: QueueWriter<I>) -> SimplePlan<I, Term>
where
    I: Send + 'static,
{
    let closer = writer.clone();
    SimplePlan::from_transform(Transform::with_close(
        move |input| {
            push_or_fail(&writer, input);
            Term
        },
        move || closer.close(),
    ))
}

fn push_or_fail<I: Send + 'static>(writer: &QueueWriter<I>, input: I) {
    if writer.push(input).is_err() {
        panic!("pipeline sink: queue closed before the pipeline drained");
    }
}

/// A self-sourced plan reading items from `reader`'s queue until it is
/// closed and drained.
pub fn source<O>(reader: QueueReader<O>) -> FullPlan<Term, O>
where
    O: Send + 'static,
{
    let trailing: TrailingBuilder<O> = Arc::new(move |cx| {
        let queue = Arc::clone(reader.shared());
        cx.wake_on_cancel(&queue);
        SourceFilter::from_queue(queue, cx.token())
    });
    FullPlan {
        leading: None,
        segments: Vec::new(),
        trailing,
    }
}

/// Runs `plan` on its own worker thread, behind a fresh bounded queue of
/// [`DEFAULT_QUEUE_CAPACITY`].
///
/// This is the only construct that inserts a thread boundary.
pub fn parallel<I, O>(plan: SimplePlan<I, O>) -> FullPlan<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    parallel_sized(plan, DEFAULT_QUEUE_CAPACITY)
}

/// [`parallel`] with an explicit boundary queue capacity.
pub fn parallel_sized<I, O>(plan: SimplePlan<I, O>, capacity: NonZeroUsize) -> FullPlan<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    let slot = BoundarySlot::<I>::new(capacity);
    let sink_slot = Arc::clone(&slot);

    // The sink half of the boundary: consume items from upstream, push
    // them across, and close the queue once upstream is done.
    let leading: LeadingBuilder<I> = Arc::new(move |cx| {
        let queue = cx.queue(&sink_slot);
        let token = cx.token();
        let closer = Arc::clone(&queue);
        Transform::with_close(
            move |input| {
                boundary_push(&queue, input, &token);
                Term
            },
            move || closer.close(),
        )
    });

    // The source half: the far side of the same slot.
    let trailing: TrailingBuilder<I> = Arc::new(move |cx| {
        let queue = cx.queue(&slot);
        SourceFilter::from_queue(queue, cx.token())
    });

    let boundary = FullPlan {
        leading: Some(leading),
        segments: Vec::new(),
        trailing,
    };
    boundary | plan
}

fn boundary_push<I: Send + 'static>(
    queue: &Arc<BoundedQueue<I>>,
    input: I,
    token: &CancellationToken,
) {
    match queue.push_with(input, token) {
        Push::Pushed => {}
        // Drop-and-exit cancellation: in-flight items are discarded.
        Push::Cancelled(_) => {}
        Push::Closed(_) => {
            // Boundary queues are closed early only by cancellation.
            if !token.is_cancelled() {
                panic!("pipeline boundary: queue closed before the pipeline drained");
            }
        }
    }
}
