//! The traversal tasks.
//!
//! [`RecursiveFind`] walks any [`RawEntrySource`](crate::RawEntrySource) and
//! can own child tasks of any backend. [`ArchiveFind`] walks the members of
//! a single archive and never recurses.

pub mod archive;
pub mod recursive;

pub use archive::ArchiveFind;
pub use recursive::RecursiveFind;
