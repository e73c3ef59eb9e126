//! Transform-only plans.

use crate::filter::Transform;

/// A plan whose whole execution is a single transform filter `I -> O`.
///
/// Simple plans carry no thread boundary. They compose with other plans
/// through the pipe operator and become runnable only after crossing at
/// least one [`parallel`](crate::plan::parallel) boundary or attaching to
/// queue endpoints.
///
/// Plans are values: cloning is cheap and clones stay independently
/// composable.
pub struct SimplePlan<I, O> {
    pub(crate) filter: Transform<I, O>,
}

impl<I, O> Clone for SimplePlan<I, O> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
        }
    }
}

impl<I, O> SimplePlan<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub(crate) fn from_transform(filter: Transform<I, O>) -> Self {
        Self { filter }
    }

    /// Applies the plan's transform to a single value.
    pub fn apply(&self, input: I) -> O {
        self.filter.apply(input)
    }
}

#[cfg(test)]
mod tests {
    use crate::plan::filter;

    #[test]
    fn test_apply_single_value() {
        let plan = filter(|x: i32| x * 3);
        assert_eq!(plan.apply(14), 42);
    }

    #[test]
    fn test_clone_is_independent() {
        let plan = filter(|x: i32| x + 1);
        let copy = plan.clone();
        assert_eq!(plan.apply(1), 2);
        assert_eq!(copy.apply(1), 2);
    }
}
