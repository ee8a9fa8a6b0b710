use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::compare::entry::default_comparer;
use crate::compare::{Comparator, Comparer};
use crate::engine::{run, EngineOptions};
use crate::entry::Entry;
use crate::error::FindError;
use crate::fs::DirectoryOptions;
use crate::results::Results;
use crate::state::State;
use crate::traits::Matcher;

// ---------------------------------------------------------------------------
// SearchBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring and executing a search.
///
/// Created via [`pullfind::search()`](crate::search). Configure with chained
/// builder methods, then call [`run()`](SearchBuilder::run) to execute.
///
/// # Example
///
/// ```rust,ignore
/// let results = pullfind::search()
///     .root("/srv/comics")
///     .matching("issue")
///     .archives(true)
///     .limit(10)
///     .collect_paths(true)
///     .run()?;
/// ```
pub struct SearchBuilder {
    root:           Option<PathBuf>,
    matcher:        Option<Box<dyn Matcher>>,
    comparer:       Comparer<Entry>,
    limit:          Option<usize>,
    max_depth:      Option<usize>,
    recursive:      bool,
    archives:       bool,
    directory:      DirectoryOptions,
    collect_paths:  bool,
    collect_errors: bool,
    state:          Option<State>,
}

impl Default for SearchBuilder {
    fn default() -> Self {
        Self {
            root:           None,
            matcher:        None,
            comparer:       Comparer::new(),
            limit:          None,
            max_depth:      None,
            recursive:      true,
            archives:       false,
            directory:      DirectoryOptions::default(),
            collect_paths:  false,
            collect_errors: false,
            state:          None,
        }
    }
}

impl SearchBuilder {
    // ── Root ──────────────────────────────────────────────────────────────

    /// Set the directory to search.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    // ── Matcher ───────────────────────────────────────────────────────────

    /// Set a custom matcher.
    ///
    /// Any type implementing [`Matcher`] is accepted, closures over `&Entry`
    /// included. Use this for regex, metadata filters, etc.
    ///
    /// For the common case of substring matching, prefer `.matching()`.
    pub fn with_matcher(mut self, m: impl Matcher + 'static) -> Self {
        self.matcher = Some(Box::new(m));
        self
    }

    /// Shorthand for substring matching.
    ///
    /// Matches entries whose name contains `pattern`, ignoring case.
    pub fn matching(mut self, pattern: impl Into<String>) -> Self {
        self.matcher = Some(Box::new(SubstringMatcher {
            pattern: pattern.into().to_lowercase(),
        }));
        self
    }

    // ── Ordering ──────────────────────────────────────────────────────────

    /// Append a rule to the order in which each directory's matches are
    /// delivered. Rules are consulted in the order they were added.
    ///
    /// Without any rule, directories come first, then natural name order,
    /// then full path.
    pub fn sort_by(mut self, rule: impl Comparator<Entry> + 'static) -> Self {
        self.comparer = self.comparer.with(rule);
        self
    }

    // ── Options ───────────────────────────────────────────────────────────

    /// Stop after `n` matches. The search simply stops stepping, so
    /// [`Results::matches`] never exceeds `n`.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Maximum traversal depth. `0` means the root only (nothing is listed),
    /// `1` means one level of children, and so on. Unlimited by default.
    /// Archive members count one level per path component.
    pub fn max_depth(mut self, d: usize) -> Self {
        self.max_depth = Some(d);
        self
    }

    /// Descend into subdirectories. Enabled by default.
    pub fn recursive(mut self, yes: bool) -> Self {
        self.recursive = yes;
        self
    }

    /// Search inside `.zip`, `.cbz`, `.tar`, `.tar.gz` and `.tar.bz2` archives found along
    /// the way. Disabled by default.
    pub fn archives(mut self, yes: bool) -> Self {
        self.archives = yes;
        self
    }

    /// Skip dotfiles and dot-directories. Hidden entries are searched by
    /// default.
    pub fn hidden(mut self, skip: bool) -> Self {
        self.directory.skip_hidden = skip;
        self
    }

    /// Honour `.ignore` and `.gitignore` files. Disabled by default.
    pub fn ignore_files(mut self, yes: bool) -> Self {
        self.directory.ignore_files = yes;
        self
    }

    /// Follow symbolic links into the directories they point at.
    /// Disabled by default.
    pub fn follow_links(mut self, yes: bool) -> Self {
        self.directory.follow_links = yes;
        self
    }

    /// Collect matched paths into [`Results::paths`].
    ///
    /// Disabled by default to avoid allocation overhead when paths aren't needed.
    pub fn collect_paths(mut self, yes: bool) -> Self {
        self.collect_paths = yes;
        self
    }

    /// Collect non-fatal errors into [`Results::errors`].
    ///
    /// Disabled by default. When enabled, recoverable errors (permission
    /// denied, symlink loops, unreadable archives) are stored in
    /// [`Results::errors`] rather than only logged.
    pub fn collect_errors(mut self, yes: bool) -> Self {
        self.collect_errors = yes;
        self
    }

    /// Run under `state`. Keep a clone (or the root it descends from) to
    /// pause the search from another thread: [`run()`](Self::run) returns
    /// at the next step with [`Results::completed`] unset.
    pub fn state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// Execute the search and return results.
    ///
    /// Blocks until the search completes, hits its limit or is paused.
    ///
    /// # Errors
    ///
    /// Returns `Err` for fatal configuration errors (no root provided,
    /// missing or unreadable root, root not a directory). Non-fatal errors
    /// during traversal are collected into [`Results::errors`] when
    /// `.collect_errors(true)` is set.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(self) -> Result<Results, FindError> {
        let root = self
            .root
            .ok_or_else(|| FindError::InvalidSource("no root provided".into()))?;
        debug!(root = %root.display(), recursive = self.recursive, archives = self.archives, "starting search");

        // Default matcher: match everything
        let matcher: Arc<dyn Matcher> = match self.matcher {
            Some(m) => Arc::from(m),
            None    => Arc::new(AllMatcher),
        };

        let comparer = if self.comparer.is_empty() {
            default_comparer()
        } else {
            self.comparer
        };

        let opts = EngineOptions {
            root,
            matcher,
            comparer,
            directory:      self.directory,
            recursive:      self.recursive,
            archives:       self.archives,
            max_depth:      self.max_depth,
            limit:          self.limit,
            collect_paths:  self.collect_paths,
            collect_errors: self.collect_errors,
            state:          self.state.unwrap_or_default(),
        };

        run(opts)
    }
}

// ---------------------------------------------------------------------------
// Built-in matchers
// ---------------------------------------------------------------------------

/// Matches entries whose name contains `pattern` (case-insensitive).
struct SubstringMatcher {
    pattern: String,
}

impl Matcher for SubstringMatcher {
    fn is_match(&self, entry: &Entry) -> bool {
        entry.name.to_lowercase().contains(&self.pattern)
    }
}

/// Matches every entry. Used when no matcher is specified.
struct AllMatcher;

impl Matcher for AllMatcher {
    fn is_match(&self, _entry: &Entry) -> bool {
        true
    }
}
