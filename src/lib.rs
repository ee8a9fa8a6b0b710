//! # pullfind
//!
//! Step-driven search engine: pausable, recursive, with pluggable backends.
//!
//! A search is a [`Task`]. Nothing happens until the caller calls
//! [`Task::advance`], and each call does one small bounded piece of work:
//! look at one raw entry, sort one batch of matches, deliver one match, or
//! forward one step to a child task. All progress lives in the task, so the
//! caller can stop, pause, interleave other work or drop the task between
//! any two steps.
//!
//! What is searched, what matches, in which order and what happens to a
//! match is decided by a [`Context`]. Where entries come from is decided by
//! a [`RawEntrySource`]. Two tasks ship with the crate:
//!
//! - [`RecursiveFind`] walks any source and can descend into containers
//!   through a [`RecursiveContext`];
//! - [`ArchiveFind`] walks the members of one zip or tar archive, sorted when the
//!   archive can seek and in archive order when it streams.
//!
//! # Quick Start
//!
//! The builder wires both tasks to the filesystem:
//!
//! ```rust
//! # fn main() -> Result<(), pullfind::FindError> {
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(dir.path().join("invoice_jan.txt"), "january").unwrap();
//! std::fs::write(dir.path().join("invoice_feb.txt"), "february").unwrap();
//! std::fs::write(dir.path().join("report.txt"), "quarterly").unwrap();
//!
//! let results = pullfind::search()
//!     .root(dir.path())
//!     .matching("invoice")
//!     .collect_paths(true)
//!     .run()?;
//!
//! assert_eq!(results.matches, 2);
//! println!("Found {} matches in {:.3}s",
//!     results.matches,
//!     results.stats.duration.as_secs_f64()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Driving a task by hand
//!
//! Any [`Context`] over any entry type works with the same machinery:
//!
//! ```rust
//! use std::cell::RefCell;
//! use pullfind::{functor_context, IterSource, RecursiveFind, Task};
//!
//! let seen = RefCell::new(Vec::new());
//! let ctx = functor_context(
//!     |w: &&str| w.len() > 2,
//!     |a: &&str, b: &&str| a < b,
//!     |w: &mut &'static str| seen.borrow_mut().push(*w),
//! );
//! let source = IterSource::new(vec!["pear", "fig", "ox", "apple"]);
//! let mut find = RecursiveFind::flat(Some(Box::new(source)), &ctx);
//!
//! while find.has_next() {
//!     find.advance();
//! }
//! assert_eq!(*seen.borrow(), vec!["apple", "fig", "pear"]);
//! ```

#![forbid(unsafe_code)]

pub mod archive;
pub mod compare;
pub mod engine;
pub mod find;
pub mod fs;

mod builder;
mod context;
mod entry;
mod error;
mod results;
mod source;
mod state;
mod task;
mod traits;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use archive::{Archive, ArchiveContext, ArchiveEntry, Member};
pub use builder::SearchBuilder;
pub use compare::{Comparator, Comparer};
pub use context::{functor_context, Context, FunctorContext, RecursiveContext};
pub use engine::Traversal;
pub use entry::{Entry, EntryKind};
pub use error::FindError;
pub use find::{ArchiveFind, RecursiveFind};
pub use results::{Results, ScanStats};
pub use source::{same_position, IterSource, RawEntrySource};
pub use state::State;
pub use task::Task;
pub use traits::Matcher;

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`SearchBuilder`] to configure and run a search.
///
/// # Example
///
/// ```rust
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("invoice.txt"), "").unwrap();
/// std::fs::write(dir.path().join("report.txt"), "").unwrap();
///
/// let results = pullfind::search()
///     .root(dir.path())
///     .matching("invoice")
///     .run()
///     .unwrap();
///
/// assert_eq!(results.matches, 1);
/// ```
pub fn search() -> SearchBuilder {
    SearchBuilder::default()
}
