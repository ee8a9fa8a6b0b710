use std::path::{Path, PathBuf};

/// A single item discovered during traversal.
///
/// Intentionally generic: the same shape describes a directory entry on disk
/// and a member inside an archive. `name` and `kind` are neutral enough for
/// any backend the engine is pointed at.
///
/// `metadata` is filled in by directory listings and by
/// [`Entry::from_path`], so rules such as
/// [`ByModified`](crate::compare::entry::ByModified) do not stat the same
/// path on every comparison. Archive members never carry filesystem
/// metadata.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Full path to the entry. Archive members are addressed as
    /// `<archive path>/<member path>`.
    pub path: PathBuf,

    /// The final path component.
    pub name: String,

    /// What kind of entry this is.
    pub kind: EntryKind,

    /// How deep below the search root this entry was found. Direct children
    /// of the root are at depth 1.
    pub depth: usize,

    /// Filesystem metadata as read when the entry was found, if any.
    pub metadata: Option<std::fs::Metadata>,
}

impl Entry {
    /// Describe `path` without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind, depth: usize) -> Self {
        let path = path.into();
        let name = file_name(&path);
        Self {
            path,
            name,
            kind,
            depth,
            metadata: None,
        }
    }

    /// Describe `path` by reading its (non-following) metadata from disk.
    /// Unreadable paths are reported as [`EntryKind::Other`].
    pub fn from_path(path: impl Into<PathBuf>, depth: usize) -> Self {
        let path = path.into();
        let metadata = std::fs::symlink_metadata(&path).ok();
        let kind = metadata
            .as_ref()
            .map(|m| EntryKind::from(m.file_type()))
            .unwrap_or(EntryKind::Other);
        let mut entry = Self::new(path, kind, depth);
        entry.metadata = metadata;
        entry
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// The kind of a traversed entry.
///
/// Kept generic so archive members and directory entries share one vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A regular file.
    File,

    /// A directory.
    Dir,

    /// A symbolic link.
    Symlink,

    /// Anything else (device files, pipes, sockets, hard links in archives, etc.).
    Other,
}

impl From<std::fs::FileType> for EntryKind {
    fn from(ft: std::fs::FileType) -> Self {
        if ft.is_dir() {
            EntryKind::Dir
        } else if ft.is_file() {
            EntryKind::File
        } else if ft.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        }
    }
}

impl From<tar::EntryType> for EntryKind {
    fn from(ty: tar::EntryType) -> Self {
        if ty.is_dir() {
            EntryKind::Dir
        } else if ty.is_file() || ty.is_contiguous() {
            EntryKind::File
        } else if ty.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        }
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
