use std::cell::RefCell;

use crate::find::RecursiveFind;
use crate::task::Task;

/// What a backend supplies so the engine can search entries of type `T`.
///
/// The engine never interprets entries itself: matching, ordering and
/// delivery are all delegated here. One context is normally shared by
/// reference across a whole traversal tree, so every method takes `&self`;
/// contexts that collect output use interior mutability.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use pullfind::{Context, IterSource, RecursiveFind, Task};
///
/// #[derive(Default)]
/// struct Evens(RefCell<Vec<u32>>);
///
/// impl Context<u32> for Evens {
///     fn check(&self, n: &u32) -> bool { n % 2 == 0 }
///     fn compare(&self, a: &u32, b: &u32) -> bool { a < b }
///     fn consume(&self, n: &mut u32) { self.0.borrow_mut().push(*n) }
/// }
///
/// let ctx = Evens::default();
/// let mut find = RecursiveFind::flat(Some(Box::new(IterSource::new(vec![6u32, 3, 2, 4]))), &ctx);
/// while find.has_next() {
///     find.advance();
/// }
/// assert_eq!(*ctx.0.borrow(), vec![2, 4, 6]);
/// ```
pub trait Context<T> {
    /// Does this entry match the search? Must be free of side effects: a
    /// task may ask more than once before deciding.
    fn check(&self, entry: &T) -> bool;

    /// Does `a` strictly precede `b`? Used to sort matches before delivery.
    /// Typically backed by a [`Comparer`](crate::compare::Comparer).
    fn compare(&self, a: &T, b: &T) -> bool;

    /// Deliver one matched entry, in sorted order where the task sorts.
    fn consume(&self, entry: &mut T);
}

/// A [`Context`] able to spawn child searches inside container entries.
pub trait RecursiveContext<T>: Context<T> {
    /// Produce a task that searches inside `entry`, or `None` when the entry
    /// is not a container. Called once for every raw entry, matched or not.
    ///
    /// The returned task owns its own raw source and only borrows this
    /// context, so it stays valid for as long as the context does.
    fn find<'a>(&'a self, parent: &RecursiveFind<'a, T>, entry: &T)
        -> Option<Box<dyn Task + 'a>>;

    /// Whether `entry` is a container this context promises to return a
    /// child task for. Returning `None` from [`find`](Self::find) for such
    /// an entry is a bug in the context and trips a debug assertion.
    fn is_container(&self, _entry: &T) -> bool {
        false
    }
}

/// A [`Context`] assembled from three closures.
pub struct FunctorContext<Ck, Cm, Cs> {
    checker: Ck,
    comparer: Cm,
    consumer: RefCell<Cs>,
}

impl<Ck, Cm, Cs> FunctorContext<Ck, Cm, Cs> {
    pub fn new(checker: Ck, comparer: Cm, consumer: Cs) -> Self {
        Self {
            checker,
            comparer,
            consumer: RefCell::new(consumer),
        }
    }

    /// Recover the consumer, e.g. to read what it collected.
    pub fn into_consumer(self) -> Cs {
        self.consumer.into_inner()
    }
}

impl<T, Ck, Cm, Cs> Context<T> for FunctorContext<Ck, Cm, Cs>
where
    Ck: Fn(&T) -> bool,
    Cm: Fn(&T, &T) -> bool,
    Cs: FnMut(&mut T),
{
    fn check(&self, entry: &T) -> bool {
        (self.checker)(entry)
    }

    fn compare(&self, a: &T, b: &T) -> bool {
        (self.comparer)(a, b)
    }

    fn consume(&self, entry: &mut T) {
        (self.consumer.borrow_mut())(entry)
    }
}

/// Shorthand for [`FunctorContext::new`].
pub fn functor_context<Ck, Cm, Cs>(checker: Ck, comparer: Cm, consumer: Cs) -> FunctorContext<Ck, Cm, Cs> {
    FunctorContext::new(checker, comparer, consumer)
}
