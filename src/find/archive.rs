use tracing::{trace, warn};

use crate::archive::{Archive, ArchiveContext, ArchiveEntry};
use crate::compare::ordering_from_precedes;
use crate::context::Context;
use crate::task::Task;

/// Where an [`ArchiveFind`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Start,
    SeekableIterate,
    SortMatched,
    SendMatched,
    NonSeekableIterate,
    Done,
}

/// A single-level search over the members of one archive.
///
/// The path is chosen once, on the first step:
///
/// - **seekable**: read one header per step and buffer matching members,
///   sort them, then per step re-open one member's data and consume it;
/// - **forward-only**: read one member per step and consume it at once if
///   it matches, in archive order. Its data is only readable during that
///   consume call.
///
/// A member whose data cannot be re-opened on the seekable path is skipped
/// without being consumed and counted in [`skipped`](Self::skipped). A
/// broken header ends the scan; whatever was matched up to that point is
/// still delivered.
///
/// Archives hold no nested searches, so [`Task::can_recursive`] is false.
pub struct ArchiveFind<'a> {
    archive: Option<Archive<'a>>,
    opener: Option<Box<dyn FnOnce() -> Option<Archive<'a>> + 'a>>,
    context: &'a dyn ArchiveContext,
    matched: std::vec::IntoIter<ArchiveEntry<'static>>,
    pending: Vec<ArchiveEntry<'static>>,
    consumed: usize,
    skipped: usize,
    step: Step,
}

impl<'a> ArchiveFind<'a> {
    /// A task over `archive`. With no archive the task finishes on its
    /// first step.
    pub fn new<C: ArchiveContext>(archive: Option<Archive<'a>>, context: &'a C) -> Self {
        Self {
            archive,
            opener: None,
            context,
            matched: Vec::new().into_iter(),
            pending: Vec::new(),
            consumed: 0,
            skipped: 0,
            step: Step::Start,
        }
    }

    /// A task that calls `open` on its first step instead of holding the
    /// archive open from construction.
    pub fn deferred<C, F>(open: F, context: &'a C) -> Self
    where
        C: ArchiveContext,
        F: FnOnce() -> Option<Archive<'a>> + 'a,
    {
        let mut find = Self::new(None, context);
        find.opener = Some(Box::new(open));
        find
    }

    pub fn step(&self) -> Step {
        self.step
    }

    /// Members handed to the context so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Matched members dropped because their data could not be re-opened.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn set_step(&mut self, step: Step) {
        trace!(from = ?self.step, to = ?step, "archive find");
        self.step = step;
    }

    fn start(&mut self) {
        if let Some(open) = self.opener.take() {
            self.archive = open();
        }
        let next = match &self.archive {
            Some(archive) if archive.is_seekable() => Step::SeekableIterate,
            Some(_) => Step::NonSeekableIterate,
            None => Step::Done,
        };
        self.set_step(next);
    }

    fn seekable_iterate(&mut self) {
        let Some(archive) = self.archive.as_mut() else {
            return self.set_step(Step::Done);
        };
        match archive.next_header() {
            Ok(Some(member)) => {
                let entry = ArchiveEntry::new(member);
                if Context::check(self.context, &entry) {
                    self.pending.push(entry);
                }
            }
            Ok(None) => self.set_step(Step::SortMatched),
            Err(err) => {
                warn!(archive = %archive.label().display(), error = %err, "unreadable archive header");
                self.set_step(Step::SortMatched);
            }
        }
    }

    fn sort_matched(&mut self) {
        let context = self.context;
        let mut pending = std::mem::take(&mut self.pending);
        pending.sort_by(ordering_from_precedes(|a: &ArchiveEntry<'static>, b: &ArchiveEntry<'static>| {
            Context::compare(context, a, b)
        }));
        self.matched = pending.into_iter();
        self.set_step(Step::SendMatched);
    }

    fn send_matched(&mut self) {
        let (Some(archive), Some(next)) = (self.archive.as_mut(), self.matched.next()) else {
            self.archive = None;
            return self.set_step(Step::Done);
        };

        let member = next.member;
        match archive.open_member(&member) {
            Ok(mut data) => {
                let mut entry = ArchiveEntry::with_data(member, &mut data);
                Context::consume(self.context, &mut entry);
                self.consumed += 1;
            }
            Err(err) => {
                warn!(member = %member.full_path().display(), error = %err, "cannot re-open archive member, skipping");
                self.skipped += 1;
            }
        }
    }

    fn non_seekable_iterate(&mut self) {
        let Some(archive) = self.archive.as_mut() else {
            return self.set_step(Step::Done);
        };

        let context = self.context;
        let mut consumed = false;
        let read = archive.next_streamed(|member, data| {
            let entry = ArchiveEntry::new(member);
            if Context::check(context, &entry) {
                let mut entry = ArchiveEntry::with_data(entry.member, data);
                Context::consume(context, &mut entry);
                consumed = true;
            }
        });

        if consumed {
            self.consumed += 1;
        }
        match read {
            Ok(true) => {}
            Ok(false) => {
                self.archive = None;
                self.set_step(Step::Done);
            }
            Err(err) => {
                warn!(archive = %archive.label().display(), error = %err, "archive stream ended early");
                self.archive = None;
                self.set_step(Step::Done);
            }
        }
    }
}

impl Task for ArchiveFind<'_> {
    fn advance(&mut self) {
        match self.step {
            Step::Start => self.start(),
            Step::SeekableIterate => self.seekable_iterate(),
            Step::SortMatched => self.sort_matched(),
            Step::SendMatched => self.send_matched(),
            Step::NonSeekableIterate => self.non_seekable_iterate(),
            Step::Done => {}
        }
    }

    fn has_next(&self) -> bool {
        self.step != Step::Done
    }

    fn is_recursive(&self) -> bool {
        false
    }

    fn set_recursive(&mut self, _recursive: bool) {}

    fn can_recursive(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for ArchiveFind<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveFind")
            .field("archive", &self.archive)
            .field("step", &self.step)
            .field("consumed", &self.consumed)
            .field("skipped", &self.skipped)
            .finish()
    }
}
