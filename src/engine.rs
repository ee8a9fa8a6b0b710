use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::archive::{Archive, ArchiveEntry, Member};
use crate::compare::Comparer;
use crate::context::{Context, RecursiveContext};
use crate::entry::{Entry, EntryKind};
use crate::error::FindError;
use crate::find::{ArchiveFind, RecursiveFind};
use crate::fs::{DirectoryOptions, DirectorySource};
use crate::results::{Results, ScanStats};
use crate::source::RawEntrySource;
use crate::state::State;
use crate::task::Task;
use crate::traits::Matcher;

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// Drives a [`Task`] under the control of a [`State`].
///
/// The task itself never looks at the state; the traversal simply stops
/// stepping while the state's root is paused and marks the state done once
/// the task finishes.
///
/// ```rust
/// use pullfind::engine::Traversal;
/// use pullfind::{functor_context, IterSource, RecursiveFind, State};
///
/// let ctx = functor_context(|_: &u8| true, |a: &u8, b: &u8| a < b, |_: &mut u8| {});
/// let find = RecursiveFind::flat(Some(Box::new(IterSource::new(vec![2u8, 1]))), &ctx);
///
/// let state = State::new();
/// let mut traversal = Traversal::new(Box::new(find), state.clone());
///
/// state.pause(true);
/// assert!(!traversal.step());
///
/// state.pause(false);
/// traversal.run();
/// assert!(state.is_done());
/// ```
pub struct Traversal<'a> {
    task: Box<dyn Task + 'a>,
    state: State,
    steps: usize,
}

impl<'a> Traversal<'a> {
    pub fn new(task: Box<dyn Task + 'a>, state: State) -> Self {
        Self { task, state, steps: 0 }
    }

    /// Advance the task once. Returns `false` when nothing was done, because
    /// the state is paused or the task has finished.
    pub fn step(&mut self) -> bool {
        if self.state.is_paused() || self.state.is_done() {
            return false;
        }
        if !self.task.has_next() {
            self.state.set_done(true);
            return false;
        }

        self.task.advance();
        self.steps += 1;
        if !self.task.has_next() {
            trace!(steps = self.steps, "traversal finished");
            self.state.set_done(true);
        }
        true
    }

    /// Step until the task finishes or the state is paused.
    pub fn run(&mut self) {
        while self.step() {}
    }

    /// Step while `keep_going` allows it. The predicate is asked before
    /// every step.
    pub fn run_while(&mut self, mut keep_going: impl FnMut() -> bool) {
        while keep_going() && self.step() {}
    }

    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn task(&self) -> &dyn Task {
        &*self.task
    }

    /// Steps taken so far.
    pub fn steps(&self) -> usize {
        self.steps
    }
}

// ---------------------------------------------------------------------------
// Engine options
// ---------------------------------------------------------------------------

/// Internal options passed from the builder to `run()`.
pub(crate) struct EngineOptions {
    pub root:           PathBuf,
    pub matcher:        Arc<dyn Matcher>,
    pub comparer:       Comparer<Entry>,
    pub directory:      DirectoryOptions,
    pub recursive:      bool,
    pub archives:       bool,
    pub max_depth:      Option<usize>,
    pub limit:          Option<usize>,
    pub collect_paths:  bool,
    pub collect_errors: bool,
    pub state:          State,
}

// ---------------------------------------------------------------------------
// SearchContext
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tally {
    matches: usize,
    files:   usize,
    dirs:    usize,
    members: usize,
    paths:   Vec<PathBuf>,
    errors:  Vec<FindError>,
}

/// The context behind [`SearchBuilder::run`](crate::SearchBuilder::run):
/// matches entries on disk and inside archives with one [`Matcher`], orders
/// them with one [`Comparer`] and tallies what it is handed.
pub(crate) struct SearchContext {
    root:           PathBuf,
    matcher:        Arc<dyn Matcher>,
    comparer:       Comparer<Entry>,
    directory:      DirectoryOptions,
    archives:       bool,
    max_depth:      Option<usize>,
    collect_paths:  bool,
    collect_errors: bool,
    tally:          RefCell<Tally>,
}

impl SearchContext {
    fn from_options(opts: &EngineOptions) -> Self {
        Self {
            root:           opts.root.clone(),
            matcher:        Arc::clone(&opts.matcher),
            comparer:       opts.comparer.clone(),
            directory:      opts.directory,
            archives:       opts.archives,
            max_depth:      opts.max_depth,
            collect_paths:  opts.collect_paths,
            collect_errors: opts.collect_errors,
            tally:          RefCell::new(Tally::default()),
        }
    }

    fn matches(&self) -> usize {
        self.tally.borrow().matches
    }

    fn record(&self, err: FindError) {
        if self.collect_errors {
            self.tally.borrow_mut().errors.push(err);
        }
    }

    fn within_depth(&self, depth: usize) -> bool {
        self.max_depth.map_or(true, |max| depth <= max)
    }

    /// Whether the children of an entry at `depth` are still wanted.
    fn descends(&self, depth: usize) -> bool {
        self.max_depth.map_or(true, |max| depth < max)
    }

    fn is_archive(&self, entry: &Entry) -> bool {
        self.archives && entry.kind == EntryKind::File && Archive::can_handle(&entry.name)
    }

    fn deliver(&self, path: &Path) {
        let mut tally = self.tally.borrow_mut();
        tally.matches += 1;
        if self.collect_paths {
            tally.paths.push(path.to_path_buf());
        }
    }

    /// Describe an archive member as an [`Entry`] below the search root.
    fn member_entry(&self, member: &Member) -> Entry {
        let path = member.full_path();
        let depth = path
            .strip_prefix(&self.root)
            .map(|rel| rel.components().count())
            .unwrap_or(0);
        Entry::new(path, member.kind, depth)
    }

    fn open_directory<'a>(&'a self, entry: &Entry) -> Option<Box<dyn RawEntrySource<Entry> + 'a>> {
        match DirectorySource::open(&entry.path, entry.depth, &self.directory) {
            Ok(source) => Some(Box::new(source.on_error(move |err| self.record(err)))),
            Err(err) => {
                debug!(dir = %entry.path.display(), error = %err, "cannot open directory");
                self.record(err);
                None
            }
        }
    }

    fn open_archive(&self, path: &Path) -> Option<Archive<'static>> {
        match Archive::open_path(path) {
            Ok(archive) => Some(archive),
            Err(err) => {
                debug!(archive = %path.display(), error = %err, "cannot open archive");
                self.record(err);
                None
            }
        }
    }
}

impl Context<Entry> for SearchContext {
    fn check(&self, entry: &Entry) -> bool {
        self.matcher.is_match(entry)
    }

    fn compare(&self, a: &Entry, b: &Entry) -> bool {
        self.comparer.precedes(a, b)
    }

    fn consume(&self, entry: &mut Entry) {
        self.deliver(&entry.path);
    }
}

impl RecursiveContext<Entry> for SearchContext {
    fn find<'a>(&'a self, parent: &RecursiveFind<'a, Entry>, entry: &Entry) -> Option<Box<dyn Task + 'a>> {
        {
            let mut tally = self.tally.borrow_mut();
            match entry.kind {
                EntryKind::Dir => tally.dirs += 1,
                EntryKind::File => tally.files += 1,
                _ => {}
            }
        }

        if !self.descends(entry.depth) {
            return None;
        }

        if entry.is_dir() {
            let mut child = RecursiveFind::new(self.open_directory(entry), self);
            child.set_recursive(parent.is_recursive());
            return Some(Box::new(child));
        }

        if self.is_archive(entry) {
            let path = entry.path.clone();
            return Some(Box::new(ArchiveFind::deferred(move || self.open_archive(&path), self)));
        }

        None
    }

    fn is_container(&self, entry: &Entry) -> bool {
        self.descends(entry.depth) && (entry.is_dir() || self.is_archive(entry))
    }
}

impl<'s> Context<ArchiveEntry<'s>> for SearchContext {
    fn check(&self, entry: &ArchiveEntry<'s>) -> bool {
        let entry = self.member_entry(&entry.member);
        self.within_depth(entry.depth) && self.matcher.is_match(&entry)
    }

    fn compare(&self, a: &ArchiveEntry<'s>, b: &ArchiveEntry<'s>) -> bool {
        self.comparer
            .precedes(&self.member_entry(&a.member), &self.member_entry(&b.member))
    }

    fn consume(&self, entry: &mut ArchiveEntry<'s>) {
        self.tally.borrow_mut().members += 1;
        self.deliver(&entry.member.full_path());
    }
}

// ---------------------------------------------------------------------------
// run()
// ---------------------------------------------------------------------------

/// Search `opts.root` one step at a time until done, paused or at the limit.
///
/// Called by `SearchBuilder::run()` after validating inputs.
pub(crate) fn run(opts: EngineOptions) -> Result<Results, FindError> {
    let ctx = SearchContext::from_options(&opts);
    let limit = opts.limit;

    let start = Instant::now();
    let completed = {
        let root = DirectorySource::open(&opts.root, 0, &opts.directory)?.on_error(|err| ctx.record(err));
        let source: Option<Box<dyn RawEntrySource<Entry> + '_>> = match opts.max_depth {
            Some(0) => None,
            _ => Some(Box::new(root)),
        };
        let mut find = RecursiveFind::new(source, &ctx);
        find.set_recursive(opts.recursive);

        let mut traversal = Traversal::new(Box::new(find), opts.state);
        traversal.run_while(|| limit.map_or(true, |lim| ctx.matches() < lim));
        debug!(steps = traversal.steps(), done = traversal.is_done(), "search stopped");
        traversal.is_done()
    };
    let duration = start.elapsed();

    let tally = ctx.tally.into_inner();
    Ok(Results {
        matches: tally.matches,
        paths: tally.paths,
        stats: ScanStats::compute(tally.files, tally.dirs, tally.members, duration),
        errors: tally.errors,
        completed,
    })
}
