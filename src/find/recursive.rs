use std::collections::VecDeque;

use tracing::trace;

use crate::compare::ordering_from_precedes;
use crate::context::{Context, RecursiveContext};
use crate::source::RawEntrySource;
use crate::task::Task;

/// Where a [`RecursiveFind`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Start,
    IterateSource,
    SortMatched,
    SendMatched,
    IterateChildren,
    Done,
}

/// A search over one level of entries that can descend into containers.
///
/// One [`advance`](Task::advance) does one of:
///
/// - inspect a single raw entry: buffer it if it matches, and ask the
///   context for a child task if it is a container;
/// - sort the buffered matches;
/// - hand a single match to [`Context::consume`];
/// - advance the current child task once.
///
/// Children are drained one after another in the order they were found,
/// each to completion before the next. Depth is carried by the owned child
/// tasks, not by the call stack: advancing a tree N levels deep costs N
/// nested calls, never more.
pub struct RecursiveFind<'a, T> {
    source: Option<Box<dyn RawEntrySource<T> + 'a>>,
    context: &'a dyn Context<T>,
    spawner: Option<&'a dyn RecursiveContext<T>>,
    matched: Vec<T>,
    cursor: usize,
    children: VecDeque<Box<dyn Task + 'a>>,
    spawned: usize,
    recursive: bool,
    step: Step,
}

impl<'a, T: Clone> RecursiveFind<'a, T> {
    /// A task over `source` that may spawn children through `context`.
    /// With no source the task finishes on its first step.
    pub fn new<C>(source: Option<Box<dyn RawEntrySource<T> + 'a>>, context: &'a C) -> Self
    where
        C: RecursiveContext<T>,
    {
        let mut find = Self::flat(source, context);
        find.spawner = Some(context);
        find
    }

    /// A task over a context without a child factory: it filters, sorts
    /// and consumes, and never has children to drain.
    pub fn flat<C>(source: Option<Box<dyn RawEntrySource<T> + 'a>>, context: &'a C) -> Self
    where
        C: Context<T>,
    {
        Self {
            source,
            context,
            spawner: None,
            matched: Vec::new(),
            cursor: 0,
            children: VecDeque::new(),
            spawned: 0,
            recursive: false,
            step: Step::Start,
        }
    }

    pub fn context(&self) -> &'a dyn Context<T> {
        self.context
    }

    pub fn step(&self) -> Step {
        self.step
    }

    /// Child tasks spawned so far, finished ones included.
    pub fn spawned(&self) -> usize {
        self.spawned
    }

    fn set_step(&mut self, step: Step) {
        trace!(from = ?self.step, to = ?step, "recursive find");
        self.step = step;
    }

    fn start(&mut self) {
        match self.source.as_mut() {
            Some(source) => {
                source.start();
                self.set_step(Step::IterateSource);
            }
            None => self.set_step(Step::Done),
        }
    }

    fn iterate_source(&mut self) {
        let (matched, child) = {
            let Some(entry) = self.source.as_ref().and_then(|s| s.current()) else {
                // Release the listing as soon as it is exhausted.
                self.source = None;
                return self.set_step(Step::SortMatched);
            };

            let matched = self.context.check(entry).then(|| entry.clone());
            let child = match self.spawner {
                Some(spawner) => {
                    let child = spawner.find(self, entry);
                    debug_assert!(
                        child.is_some() || !spawner.is_container(entry),
                        "RecursiveContext::find returned no task for a container entry"
                    );
                    child
                }
                None => None,
            };
            (matched, child)
        };

        self.matched.extend(matched);
        if let Some(child) = child {
            self.children.push_back(child);
            self.spawned += 1;
        }
        if let Some(source) = self.source.as_mut() {
            source.advance();
        }
    }

    fn sort_matched(&mut self) {
        let context = self.context;
        self.matched
            .sort_by(ordering_from_precedes(|a: &T, b: &T| context.compare(a, b)));
        self.cursor = 0;
        self.set_step(Step::SendMatched);
    }

    fn send_matched(&mut self) {
        if let Some(entry) = self.matched.get_mut(self.cursor) {
            self.context.consume(entry);
            self.cursor += 1;
            return;
        }

        self.matched = Vec::new();
        if self.recursive {
            self.set_step(Step::IterateChildren);
        } else {
            self.children.clear();
            self.set_step(Step::Done);
        }
    }

    fn iterate_children(&mut self) {
        match self.children.front_mut() {
            Some(child) => {
                child.advance();
                if !child.has_next() {
                    self.children.pop_front();
                }
            }
            None => self.set_step(Step::Done),
        }
    }
}

impl<T: Clone> Task for RecursiveFind<'_, T> {
    fn advance(&mut self) {
        match self.step {
            Step::Start => self.start(),
            Step::IterateSource => self.iterate_source(),
            Step::SortMatched => self.sort_matched(),
            Step::SendMatched => self.send_matched(),
            Step::IterateChildren => self.iterate_children(),
            Step::Done => {}
        }
    }

    fn has_next(&self) -> bool {
        self.step != Step::Done
    }

    fn is_recursive(&self) -> bool {
        self.recursive
    }

    fn set_recursive(&mut self, recursive: bool) {
        self.recursive = recursive;
    }

    fn can_recursive(&self) -> bool {
        true
    }
}
