use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FindError {
    // Sources
    #[error("path not found")]
    NotFound(PathBuf),

    #[error("not a directory")]
    NotADirectory(PathBuf),

    #[error("permission denied")]
    PermissionDenied(PathBuf),

    #[error("invalid source")]
    InvalidSource(PathBuf),

    #[error("symlink loop detected")]
    SymlinkLoop(PathBuf),

    // Containers
    #[error("unsupported container format: {0}")]
    UnsupportedFormat(String),

    #[error("archive error")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Runtime
    #[error("IO error")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Third-party extensibility
    #[error("source error: {0}")]
    Source(String),
}

impl FindError {
    /// The path this error occurred at, if applicable.
    /// Callers use this to present "Skipped: <path>" without pattern matching on variants.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::NotFound(p)
            | Self::NotADirectory(p)
            | Self::PermissionDenied(p)
            | Self::InvalidSource(p)
            | Self::SymlinkLoop(p)
            | Self::Archive { path: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            _ => None,
        }
    }

    /// Whether the search can continue after this error.
    ///
    /// Recoverable errors (permission denied, symlink loops, unsupported or
    /// broken archives, IO) are collected and surfaced after the search completes;
    /// the traversal keeps going with fewer results.
    ///
    /// Fatal errors (missing or invalid root) stop the search before it starts.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_)
                | Self::SymlinkLoop(_)
                | Self::UnsupportedFormat(_)
                | Self::Archive { .. }
                | Self::Io { .. }
        )
    }

    /// Map an IO error raised while opening `path` to the closest variant.
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { path, source },
        }
    }
}
