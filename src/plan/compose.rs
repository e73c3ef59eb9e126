//! The pipe operator: the four composition rules over plan shapes.
//!
//! The rules are total over the types the constructors can produce. The
//! middle type of every composition must line up, so an ill-typed pipe is
//! a compile error, and only a `FullPlan<Term, Term>` can reach the
//! runtime.

use super::full::{FullPlan, LeadingBuilder, SegmentBuilder};
use super::simple::SimplePlan;
use crate::filter::Transform;
use std::ops::BitOr;
use std::sync::Arc;

/// Simple | Simple: fuse the two transforms into one.
impl<I, M, O> BitOr<SimplePlan<M, O>> for SimplePlan<I, M>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
{
    type Output = SimplePlan<I, O>;

    fn bitor(self, rhs: SimplePlan<M, O>) -> SimplePlan<I, O> {
        SimplePlan::from_transform(self.filter.then(rhs.filter))
    }
}

/// Full | Simple: extend the trailing segment; no new thread boundary.
impl<I, M, O> BitOr<SimplePlan<M, O>> for FullPlan<I, M>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
{
    type Output = FullPlan<I, O>;

    fn bitor(self, rhs: SimplePlan<M, O>) -> FullPlan<I, O> {
        let upstream = self.trailing;
        let next = rhs.filter;
        FullPlan {
            leading: self.leading,
            segments: self.segments,
            trailing: Arc::new(move |cx| upstream(cx).then_transform(next.clone())),
        }
    }
}

/// Simple | Full: prepend to the leading transform, or become it.
impl<I, M, O> BitOr<FullPlan<M, O>> for SimplePlan<I, M>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
{
    type Output = FullPlan<I, O>;

    fn bitor(self, rhs: FullPlan<M, O>) -> FullPlan<I, O> {
        let first = self.filter;
        let leading: LeadingBuilder<I> = match rhs.leading {
            Some(lead) => Arc::new(move |cx| first.clone().then(lead(cx))),
            // The right operand is self-sourced, so M is Term by
            // construction and the simple filter's outputs are terminal.
            None => Arc::new(move |_cx| first.clone().then(Transform::discard())),
        };
        FullPlan {
            leading: Some(leading),
            segments: rhs.segments,
            trailing: rhs.trailing,
        }
    }
}

/// Full | Full: the join point is a thread boundary. The left plan's
/// trailing segment chains with the right plan's leading transform to form
/// a sealed interior segment.
impl<I, M, O> BitOr<FullPlan<M, O>> for FullPlan<I, M>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
{
    type Output = FullPlan<I, O>;

    fn bitor(self, rhs: FullPlan<M, O>) -> FullPlan<I, O> {
        let upstream = self.trailing;
        let join: SegmentBuilder = match rhs.leading {
            Some(lead) => Arc::new(move |cx| {
                let source = upstream(cx);
                source.then_transform(lead(cx)).into_runnable()
            }),
            // Self-sourced right operand: the left trailing's outputs are
            // terminal (M is Term by construction).
            None => Arc::new(move |cx| upstream(cx).into_runnable()),
        };
        let mut segments = self.segments;
        segments.push(join);
        segments.extend(rhs.segments);
        FullPlan {
            leading: self.leading,
            segments,
            trailing: rhs.trailing,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::plan::{filter, parallel, sink_and_close, source};
    use crate::sync::bounded;
    use std::num::NonZeroUsize;

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_simple_pipe_simple_fuses() {
        let plan = filter(|x: i32| x + 1) | filter(|x: i32| x * 2);
        assert_eq!(plan.apply(3), 8);
    }

    #[test]
    fn test_operands_stay_usable_through_clones() {
        let double = filter(|x: i32| x * 2);
        let inc = filter(|x: i32| x + 1);
        let first = double.clone() | inc.clone();
        let second = inc | double;
        assert_eq!(first.apply(5), 11);
        assert_eq!(second.apply(5), 12);
    }

    #[test]
    fn test_segment_count_tracks_boundaries() {
        let (_tx, rx) = bounded::<i32>(cap(4));
        let (out_tx, _out_rx) = bounded::<i32>(cap(4));
        let one_boundary = source(rx.clone()) | parallel(filter(|x: i32| x))
            | sink_and_close(out_tx.clone());
        assert_eq!(one_boundary.segment_count(), 2);

        let two_boundaries = source(rx)
            | parallel(filter(|x: i32| x + 1))
            | parallel(filter(|x: i32| x * 2))
            | sink_and_close(out_tx);
        assert_eq!(two_boundaries.segment_count(), 3);
    }

    #[test]
    fn test_full_pipe_simple_keeps_segments() {
        let (_tx, rx) = bounded::<i32>(cap(4));
        let plan = source(rx) | filter(|x: i32| x + 1);
        assert_eq!(plan.segment_count(), 1);
    }
}
