use std::fmt;
use std::path::{Path, PathBuf};

use ignore::{Walk, WalkBuilder};
use tracing::debug;

use crate::entry::{Entry, EntryKind};
use crate::error::FindError;
use crate::source::RawEntrySource;

// ---------------------------------------------------------------------------
// DirectoryOptions
// ---------------------------------------------------------------------------

/// Listing filters applied to every directory a search opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryOptions {
    /// Leave out dotfiles and dot-directories.
    pub skip_hidden: bool,

    /// Honour `.ignore`, `.gitignore` and `.git/info/exclude` files in the
    /// listed directory and its parents.
    pub ignore_files: bool,

    /// Report symlinks by what they point at, so linked directories are
    /// descended into.
    pub follow_links: bool,
}

/// Whether `path` is something a [`DirectorySource`] can list.
pub fn can_find(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_dir()
}

// ---------------------------------------------------------------------------
// DirectorySource
// ---------------------------------------------------------------------------

/// The immediate children of one directory, in the order the host
/// filesystem lists them.
///
/// The directory handle is opened by [`start`](RawEntrySource::start), not
/// by [`open`](Self::open), so a search holding thousands of pending
/// subdirectory tasks only keeps open the handles it is actually reading.
/// The handle is released as soon as the listing is exhausted.
///
/// Entries that cannot be read are skipped; pass [`on_error`](Self::on_error)
/// to hear about them.
pub struct DirectorySource<'a> {
    dir: PathBuf,
    depth: usize,
    options: DirectoryOptions,
    walk: Option<Walk>,
    current: Option<Entry>,
    position: usize,
    on_error: Option<Box<dyn FnMut(FindError) + 'a>>,
}

impl<'a> DirectorySource<'a> {
    /// A listing of `dir`, whose own depth below the search root is `depth`.
    /// Its children are reported at `depth + 1`.
    ///
    /// # Errors
    ///
    /// Fails when `dir` does not exist, cannot be read or is not a directory.
    pub fn open(dir: impl Into<PathBuf>, depth: usize, options: &DirectoryOptions) -> Result<Self, FindError> {
        let dir = dir.into();
        let metadata = std::fs::metadata(&dir).map_err(|e| FindError::from_io(&dir, e))?;
        if !metadata.is_dir() {
            return Err(FindError::NotADirectory(dir));
        }

        Ok(Self {
            dir,
            depth,
            options: *options,
            walk: None,
            current: None,
            position: 0,
            on_error: None,
        })
    }

    /// Report entries that could not be read to `sink` instead of only
    /// logging them.
    pub fn on_error(mut self, sink: impl FnMut(FindError) + 'a) -> Self {
        self.on_error = Some(Box::new(sink));
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn walker(&self) -> Walk {
        let opts = &self.options;
        let mut builder = WalkBuilder::new(&self.dir);
        builder
            .standard_filters(false)
            .max_depth(Some(1))
            .hidden(opts.skip_hidden)
            .ignore(opts.ignore_files)
            .git_ignore(opts.ignore_files)
            .git_exclude(opts.ignore_files)
            .parents(opts.ignore_files)
            .git_global(false)
            .require_git(false)
            .follow_links(opts.follow_links)
            .same_file_system(false);
        builder.build()
    }

    /// Move `current` to the next readable child, or release the listing.
    fn fill(&mut self) {
        self.current = None;
        let Some(walk) = self.walk.as_mut() else {
            return;
        };

        for result in walk.by_ref() {
            let dent = match result {
                Ok(dent) => dent,
                Err(err) => {
                    let err = map_ignore_error(err);
                    debug!(dir = %self.dir.display(), error = %err, "skipping unreadable entry");
                    if let Some(sink) = self.on_error.as_mut() {
                        sink(err);
                    }
                    continue;
                }
            };

            // The walk reports the listed directory itself first.
            if dent.depth() == 0 {
                continue;
            }

            let kind = dent.file_type().map(EntryKind::from).unwrap_or(EntryKind::Other);
            let metadata = dent.metadata().ok();
            let mut entry = Entry::new(dent.into_path(), kind, self.depth + 1);
            entry.metadata = metadata;
            self.current = Some(entry);
            return;
        }

        self.walk = None;
    }
}

impl RawEntrySource<Entry> for DirectorySource<'_> {
    fn start(&mut self) {
        if self.walk.is_none() && self.position == 0 {
            self.walk = Some(self.walker());
            self.fill();
        }
    }

    fn current(&self) -> Option<&Entry> {
        self.current.as_ref()
    }

    fn advance(&mut self) {
        if self.current.is_some() {
            self.position += 1;
            self.fill();
        }
    }

    fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Debug for DirectorySource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectorySource")
            .field("dir", &self.dir)
            .field("depth", &self.depth)
            .field("open", &self.walk.is_some())
            .field("position", &self.position)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Map ignore::Error to FindError
// ---------------------------------------------------------------------------

fn map_ignore_error(e: ignore::Error) -> FindError {
    match e {
        ignore::Error::WithPath { path, err } => match *err {
            ignore::Error::Io(io_err) => FindError::from_io(path, io_err),
            other => FindError::Source(format!("{}: {}", path.display(), other)),
        },
        ignore::Error::WithDepth { err, .. } => map_ignore_error(*err),
        ignore::Error::Loop { child, .. } => FindError::SymlinkLoop(child),
        ignore::Error::Io(io_err) => FindError::Io {
            path: PathBuf::new(),
            source: io_err,
        },
        other => FindError::Source(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fs;

    use super::*;

    fn listing(source: &mut DirectorySource<'_>) -> Vec<String> {
        source.start();
        let mut names = Vec::new();
        while let Some(entry) = source.current() {
            names.push(entry.name.clone());
            source.advance();
        }
        names.sort();
        names
    }

    #[test]
    fn lists_immediate_children_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("deep.txt"), "d").unwrap();

        let mut source = DirectorySource::open(dir.path(), 0, &DirectoryOptions::default()).unwrap();
        assert_eq!(listing(&mut source), vec!["a.txt", "sub"]);
        assert_eq!(source.position(), 2);
        assert!(source.is_exhausted());
    }

    #[test]
    fn children_are_one_level_deeper() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut source = DirectorySource::open(dir.path(), 3, &DirectoryOptions::default()).unwrap();
        source.start();
        let entry = source.current().unwrap();
        assert_eq!(entry.depth, 4);
        assert_eq!(entry.kind, EntryKind::Dir);
    }

    #[test]
    fn listed_entries_carry_metadata() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "four").unwrap();

        let mut source = DirectorySource::open(dir.path(), 0, &DirectoryOptions::default()).unwrap();
        source.start();
        let metadata = source.current().unwrap().metadata.as_ref().unwrap();
        assert!(metadata.is_file());
        assert_eq!(metadata.len(), 4);
    }

    #[test]
    fn nothing_is_read_before_start() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let source = DirectorySource::open(dir.path(), 0, &DirectoryOptions::default()).unwrap();
        assert!(source.current().is_none());
        assert!(source.walk.is_none());
    }

    #[test]
    fn hidden_entries_follow_option() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".secret"), "s").unwrap();
        fs::write(dir.path().join("plain"), "p").unwrap();

        let mut all = DirectorySource::open(dir.path(), 0, &DirectoryOptions::default()).unwrap();
        assert_eq!(listing(&mut all), vec![".secret", "plain"]);

        let opts = DirectoryOptions {
            skip_hidden: true,
            ..DirectoryOptions::default()
        };
        let mut visible = DirectorySource::open(dir.path(), 0, &opts).unwrap();
        assert_eq!(listing(&mut visible), vec!["plain"]);
    }

    #[test]
    fn ignore_files_follow_option() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".ignore"), "*.log\n").unwrap();
        fs::write(dir.path().join("app.log"), "l").unwrap();
        fs::write(dir.path().join("app.rs"), "r").unwrap();

        let mut all = DirectorySource::open(dir.path(), 0, &DirectoryOptions::default()).unwrap();
        assert_eq!(listing(&mut all), vec![".ignore", "app.log", "app.rs"]);

        let opts = DirectoryOptions {
            ignore_files: true,
            ..DirectoryOptions::default()
        };
        let mut filtered = DirectorySource::open(dir.path(), 0, &opts).unwrap();
        assert_eq!(listing(&mut filtered), vec![".ignore", "app.rs"]);
    }

    #[test]
    fn open_rejects_files_and_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        fs::write(&file, "x").unwrap();

        let err = DirectorySource::open(&file, 0, &DirectoryOptions::default()).unwrap_err();
        assert!(matches!(err, FindError::NotADirectory(_)));
        assert!(!can_find(&file));

        let err = DirectorySource::open(dir.path().join("gone"), 0, &DirectoryOptions::default()).unwrap_err();
        assert!(matches!(err, FindError::NotFound(_)));
        assert!(can_find(dir.path()));
    }

    #[test]
    fn listing_released_when_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("only"), "x").unwrap();

        let errors = RefCell::new(Vec::new());
        let mut source = DirectorySource::open(dir.path(), 0, &DirectoryOptions::default())
            .unwrap()
            .on_error(|e| errors.borrow_mut().push(e));
        listing(&mut source);
        assert!(source.walk.is_none());
        source.advance();
        assert_eq!(source.position(), 1);
        drop(source);
        assert!(errors.borrow().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_reported_unless_followed() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let kind_of_link = |opts: DirectoryOptions| {
            let mut source = DirectorySource::open(dir.path(), 0, &opts).unwrap();
            source.start();
            while let Some(entry) = source.current() {
                if entry.name == "link" {
                    return entry.kind;
                }
                source.advance();
            }
            panic!("link not listed");
        };

        assert_eq!(kind_of_link(DirectoryOptions::default()), EntryKind::Symlink);
        let follow = DirectoryOptions {
            follow_links: true,
            ..DirectoryOptions::default()
        };
        assert_eq!(kind_of_link(follow), EntryKind::Dir);
    }
}
