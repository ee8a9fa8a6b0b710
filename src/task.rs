/// A step-driven search.
///
/// Nothing happens until the caller calls [`advance`](Self::advance); each
/// call performs one bounded unit of work and returns. All progress lives in
/// the task itself, so a caller may interleave anything between two calls,
/// stop calling and drop the task at any point, or drive many tasks side by
/// side.
///
/// Every backend (directory trees, archives, in-memory lists) implements
/// this trait, which is what lets a parent task own children of any backend.
pub trait Task {
    /// Perform one step. Always safe to call, including after completion,
    /// where it does nothing.
    fn advance(&mut self);

    /// Whether more work remains.
    fn has_next(&self) -> bool;

    /// Whether this task will descend into the children it spawns.
    fn is_recursive(&self) -> bool;

    /// Toggle descent. Effective until the task starts draining children;
    /// backends that cannot recurse ignore it.
    fn set_recursive(&mut self, recursive: bool);

    /// Whether this backend can recurse at all. Fixed per backend.
    fn can_recursive(&self) -> bool;

    fn is_done(&self) -> bool {
        !self.has_next()
    }
}

impl<T: Task + ?Sized> Task for Box<T> {
    fn advance(&mut self) {
        (**self).advance()
    }

    fn has_next(&self) -> bool {
        (**self).has_next()
    }

    fn is_recursive(&self) -> bool {
        (**self).is_recursive()
    }

    fn set_recursive(&mut self, recursive: bool) {
        (**self).set_recursive(recursive)
    }

    fn can_recursive(&self) -> bool {
        (**self).can_recursive()
    }
}
