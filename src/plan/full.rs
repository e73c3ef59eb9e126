//! Plans containing at least one thread boundary.

use super::boundary::Materializer;
use crate::filter::{RunnableFilter, SourceFilter, Term, Transform};
use std::sync::Arc;
use tracing::warn;

/// Builds the leading half of a plan: the transform that consumes values
/// fed in from outside and pushes them at the first thread boundary.
pub(crate) type LeadingBuilder<I> =
    Arc<dyn Fn(&mut Materializer) -> Transform<I, Term> + Send + Sync>;

/// Builds one interior `Term -> Term` segment.
pub(crate) type SegmentBuilder = Arc<dyn Fn(&mut Materializer) -> RunnableFilter + Send + Sync>;

/// Builds the trailing half: the final segment, with its output type still
/// exposed for further composition.
pub(crate) type TrailingBuilder<O> =
    Arc<dyn Fn(&mut Materializer) -> SourceFilter<O> + Send + Sync>;

/// A plan with one or more thread boundaries.
///
/// Structurally a triple: an optional leading transform `I -> Term` feeding
/// the first boundary, a list of sealed interior segments, and a trailing
/// segment whose output type `O` stays open for composition. Each part is a
/// builder evaluated against a fresh build context when an execution starts,
/// so the descriptor tree itself is immutable and cheap to clone.
pub struct FullPlan<I, O> {
    pub(crate) leading: Option<LeadingBuilder<I>>,
    pub(crate) segments: Vec<SegmentBuilder>,
    pub(crate) trailing: TrailingBuilder<O>,
}

/// The canonical, executable plan shape: self-sourced and self-consumed.
pub type PipelinePlan = FullPlan<Term, Term>;

impl<I, O> Clone for FullPlan<I, O> {
    fn clone(&self) -> Self {
        Self {
            leading: self.leading.as_ref().map(Arc::clone),
            segments: self.segments.clone(),
            trailing: Arc::clone(&self.trailing),
        }
    }
}

impl<I, O> FullPlan<I, O> {
    /// Number of pipeline segments, which is also the number of worker
    /// threads an execution of this plan will occupy.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len() + 1
    }
}

impl PipelinePlan {
    /// Builds every segment of the plan against `cx`, in pipeline order.
    pub(crate) fn materialize(&self, cx: &mut Materializer) -> Vec<RunnableFilter> {
        if self.leading.is_some() {
            warn!("canonical plan has an unconnected input stage; it will not be driven");
        }
        let mut filters = Vec::with_capacity(self.segments.len() + 1);
        for build in &self.segments {
            filters.push(build(cx));
        }
        filters.push((self.trailing)(cx).into_runnable());
        filters
    }
}
