use std::any::TypeId;

/// A cursor over raw candidate entries.
///
/// Implement this to let a traversal task pull entries from anything
/// enumerable: a directory listing, an in-memory list, a database cursor.
/// The task owning a source is its only user; sources are never shared.
///
/// A source is positioned on its first candidate by [`start`](Self::start),
/// which the owning task calls exactly once before reading. After that,
/// [`current`](Self::current) peeks without moving and
/// [`advance`](Self::advance) moves past the current candidate. `current`
/// returning `None` means the source is exhausted.
///
/// Dropping a source must release whatever handle it holds, whether or not
/// it was exhausted.
pub trait RawEntrySource<T> {
    /// Acquire the underlying handle and position on the first candidate.
    /// Sources that are ready on construction keep the default no-op.
    fn start(&mut self) {}

    /// The candidate under the cursor, or `None` once exhausted.
    fn current(&self) -> Option<&T>;

    /// Move past the current candidate. A no-op once exhausted.
    fn advance(&mut self);

    /// How many candidates the cursor has moved past.
    fn position(&self) -> usize;

    fn is_exhausted(&self) -> bool {
        self.current().is_none()
    }
}

impl<T, S: RawEntrySource<T> + ?Sized> RawEntrySource<T> for Box<S> {
    fn start(&mut self) {
        (**self).start()
    }

    fn current(&self) -> Option<&T> {
        (**self).current()
    }

    fn advance(&mut self) {
        (**self).advance()
    }

    fn position(&self) -> usize {
        (**self).position()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}

/// Two source cursors are equal when they are the same concrete source type
/// at the same position. Sources of different types never compare equal.
pub fn same_position<T, A, B>(a: &A, b: &B) -> bool
where
    A: RawEntrySource<T> + 'static,
    B: RawEntrySource<T> + 'static,
{
    TypeId::of::<A>() == TypeId::of::<B>() && a.position() == b.position()
}

/// A [`RawEntrySource`] over any iterator.
///
/// ```rust
/// use pullfind::{IterSource, RawEntrySource};
///
/// let mut source = IterSource::new(["a", "b"]);
/// assert_eq!(source.current(), Some(&"a"));
/// source.advance();
/// assert_eq!(source.current(), Some(&"b"));
/// source.advance();
/// assert!(source.is_exhausted());
/// ```
pub struct IterSource<I: Iterator> {
    iter: I,
    current: Option<I::Item>,
    position: usize,
}

impl<I: Iterator> IterSource<I> {
    pub fn new(items: impl IntoIterator<IntoIter = I>) -> Self {
        let mut iter = items.into_iter();
        let current = iter.next();
        Self {
            iter,
            current,
            position: 0,
        }
    }
}

impl<I: Iterator> RawEntrySource<I::Item> for IterSource<I> {
    fn current(&self) -> Option<&I::Item> {
        self.current.as_ref()
    }

    fn advance(&mut self) {
        if self.current.is_some() {
            self.current = self.iter.next();
            self.position += 1;
        }
    }

    fn position(&self) -> usize {
        self.position
    }
}
