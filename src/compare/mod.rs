//! Composable ordering.
//!
//! A [`Comparer`] holds an ordered chain of [`Comparator`] rules. Each rule
//! answers with a tri-state [`Ordering`]: `Less` (a comes first), `Equal`
//! (tie, ask the next rule) or `Greater` (b comes first). The first rule
//! that does not tie decides the pair.
//!
//! A pair on which every rule ties is `Equal`, so the chain is a strict
//! weak ordering whenever each rule is one, and any sort routine may use it.

use std::cmp::Ordering;
use std::sync::Arc;

pub mod entry;

/// One pairwise rule in a [`Comparer`] chain.
///
/// Implemented for every `Fn(&T, &T) -> Ordering + Send + Sync` closure.
///
/// `Send + Sync` are required so a chain can be shared with parallel sorts.
pub trait Comparator<T: ?Sized>: Send + Sync {
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

impl<T: ?Sized, F> Comparator<T> for F
where
    F: Fn(&T, &T) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}

/// An ordered chain of comparison rules.
///
/// ```rust
/// use pullfind::compare::Comparer;
///
/// let comparer = Comparer::new()
///     .with(|a: &(u8, u8), b: &(u8, u8)| a.0.cmp(&b.0))
///     .with(|a: &(u8, u8), b: &(u8, u8)| b.1.cmp(&a.1));
///
/// let mut pairs = vec![(2, 1), (1, 1), (1, 9)];
/// comparer.sort(&mut pairs);
/// assert_eq!(pairs, vec![(1, 9), (1, 1), (2, 1)]);
/// ```
pub struct Comparer<T: ?Sized> {
    comparators: Vec<Option<Arc<dyn Comparator<T>>>>,
}

impl<T: ?Sized> Default for Comparer<T> {
    fn default() -> Self {
        Self {
            comparators: Vec::new(),
        }
    }
}

impl<T: ?Sized> Clone for Comparer<T> {
    fn clone(&self) -> Self {
        Self {
            comparators: self.comparators.clone(),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for Comparer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comparer")
            .field("rules", &self.comparators.len())
            .finish()
    }
}

impl<T: ?Sized> Comparer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. An absent rule stays in the chain as a no-op.
    pub fn add_comparator(&mut self, comparator: Option<Arc<dyn Comparator<T>>>) {
        self.comparators.push(comparator);
    }

    /// Builder form of [`add_comparator`](Self::add_comparator).
    pub fn with(mut self, comparator: impl Comparator<T> + 'static) -> Self {
        self.comparators.push(Some(Arc::new(comparator)));
        self
    }

    /// Number of registered rules, absent ones included.
    pub fn len(&self) -> usize {
        self.comparators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparators.is_empty()
    }

    /// Evaluate the chain for one pair.
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        for comparator in self.comparators.iter().flatten() {
            match comparator.compare(a, b) {
                Ordering::Equal => continue,
                decided => return decided,
            }
        }
        Ordering::Equal
    }

    /// Whether `a` strictly precedes `b`. False on a full tie.
    pub fn precedes(&self, a: &T, b: &T) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}

impl<T> Comparer<T> {
    /// Sort in place. The sort is stable, so entries the chain considers
    /// equal keep their relative order.
    pub fn sort(&self, items: &mut [T]) {
        items.sort_by(|a, b| self.compare(a, b));
    }

    /// Sort in place on the rayon thread pool.
    #[cfg(feature = "parallel")]
    pub fn par_sort(&self, items: &mut [T])
    where
        T: Send,
    {
        use rayon::slice::ParallelSliceMut;
        items.par_sort_by(|a, b| self.compare(a, b));
    }
}

impl<T: ?Sized> Comparator<T> for Comparer<T> {
    fn compare(&self, a: &T, b: &T) -> Ordering {
        Comparer::compare(self, a, b)
    }
}

/// Flip the verdict of the wrapped rule (descending order).
#[derive(Debug, Clone, Copy, Default)]
pub struct Reverse<C>(pub C);

impl<T: ?Sized, C: Comparator<T>> Comparator<T> for Reverse<C> {
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self.0.compare(b, a)
    }
}

/// Recover a total [`Ordering`] from a "does `a` precede `b`" predicate.
///
/// This is how the traversal tasks sort with [`Context::compare`](crate::Context::compare):
/// two values neither of which precedes the other are `Equal`.
pub fn ordering_from_precedes<T: ?Sized>(
    precedes: impl Fn(&T, &T) -> bool,
) -> impl Fn(&T, &T) -> Ordering {
    move |a: &T, b: &T| {
        if precedes(a, b) {
            Ordering::Less
        } else if precedes(b, a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}
