//! Container backend: zip archives, and tar archives optionally gzip or
//! bzip2 compressed.
//!
//! [`Format::from_name`] resolves a file name to a decoder the same way for
//! every caller: pop a compression suffix (`.gz`, `.bz2`) if there is one,
//! then look for a container extension (`.zip`, `.cbz`, `.tar`). Short forms
//! `.tgz`, `.tbz2` and `.tbz` are recognised directly. Names that resolve to
//! nothing are simply unsupported; ask [`Archive::can_handle`] before opening.
//!
//! Only a container without an outer compression layer over a [`Seek`]able
//! reader can revisit members, so only that combination yields a seekable
//! [`Archive`]. Every other combination streams forward once.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bzip2::read::BzDecoder;
use flate2::read::MultiGzDecoder;
use tracing::debug;
use zip::ZipArchive;

use crate::context::Context;
use crate::entry::{file_name, EntryKind};
use crate::error::FindError;

const BLOCK: u64 = 512;
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
const BZIP2_MAGIC: [u8; 3] = [0x42, 0x5A, 0x68];

/// A compression layer wrapped around a container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    #[default]
    None,
    /// gzip (.gz)
    Gzip,
    /// bzip2 (.bz2)
    Bzip2,
}

impl Compression {
    /// Detect compression from the last extension of `name`.
    #[must_use]
    pub fn from_path(name: impl AsRef<Path>) -> Self {
        name.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| match ext.to_lowercase().as_str() {
                "gz" => Compression::Gzip,
                "bz2" => Compression::Bzip2,
                _ => Compression::None,
            })
            .unwrap_or(Compression::None)
    }

    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
            Compression::Bzip2 => ".bz2",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
        }
    }

    /// Whether `bytes` start like a stream of this format. Too few bytes to
    /// tell counts as a match.
    #[must_use]
    pub fn check_magic_bytes(&self, bytes: &[u8]) -> bool {
        let magic: &[u8] = match self {
            Compression::None => return true,
            Compression::Gzip => &GZIP_MAGIC,
            Compression::Bzip2 => &BZIP2_MAGIC,
        };
        bytes.len() < magic.len() || bytes.starts_with(magic)
    }

    fn wrap_reader<'a>(&self, reader: impl Read + 'a) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(MultiGzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(BzDecoder::new(reader)),
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// A container layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Container {
    Tar,
    /// zip, and comic book zips (`.cbz`). Members carry their own
    /// compression.
    Zip,
}

/// A resolved container decoder: layout plus compression layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Format {
    pub container: Container,
    pub compression: Compression,
}

impl Format {
    /// Resolve a file name to a decoder, or `None` when unsupported.
    #[must_use]
    pub fn from_name(name: impl AsRef<Path>) -> Option<Self> {
        let name = name.as_ref();
        let ext = name.extension()?.to_str()?.to_lowercase();

        let (container, compression) = match ext.as_str() {
            "tar" => (Container::Tar, Compression::None),
            "zip" | "cbz" => (Container::Zip, Compression::None),
            "tgz" => (Container::Tar, Compression::Gzip),
            "tbz" | "tbz2" => (Container::Tar, Compression::Bzip2),
            "gz" | "bz2" => {
                let inner = Path::new(name.file_stem()?).extension()?.to_str()?.to_lowercase();
                match inner.as_str() {
                    "tar" => (Container::Tar, Compression::from_path(name)),
                    _ => return None,
                }
            }
            _ => return None,
        };
        Some(Self {
            container,
            compression,
        })
    }

    /// Whether a reader of this format can revisit members.
    pub fn is_seekable(&self) -> bool {
        self.compression == Compression::None
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match (self.container, self.compression) {
            (Container::Zip, _) => write!(f, "zip"),
            (Container::Tar, Compression::None) => write!(f, "tar"),
            (Container::Tar, compression) => write!(f, "tar{}", compression.extension()),
        }
    }
}

/// A member of an archive, without its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// The name the archive was opened under.
    pub archive: Arc<Path>,
    /// Path of the member inside the archive.
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Size of the member's data in bytes.
    pub size: u64,
    /// Position of this member in the archive, counting from zero.
    pub index: usize,
    /// Byte offset of the data within a seekable tar. Unused for zip,
    /// whose members are found again by index.
    offset: u64,
}

impl Member {
    /// Member path as text, without the trailing `/` directories carry.
    pub fn name(&self) -> String {
        let name = self.path.to_string_lossy();
        name.trim_end_matches('/').to_string()
    }

    /// Final component of the member path.
    pub fn file_name(&self) -> String {
        file_name(&self.path)
    }

    /// `<archive>/<member path>`
    pub fn full_path(&self) -> PathBuf {
        self.archive.join(&self.path)
    }

    fn read<R: Read>(entry: &tar::Entry<'_, R>, archive: &Arc<Path>, base: u64, index: usize) -> io::Result<Self> {
        Ok(Self {
            archive: Arc::clone(archive),
            path: entry.path()?.into_owned(),
            kind: EntryKind::from(entry.header().entry_type()),
            size: entry.size(),
            index,
            offset: base + entry.raw_file_position(),
        })
    }

    fn zipped(archive: &Arc<Path>, index: usize, name: &str, is_dir: bool, size: u64) -> Self {
        Self {
            archive: Arc::clone(archive),
            path: PathBuf::from(name),
            kind: if is_dir { EntryKind::Dir } else { EntryKind::File },
            size,
            index,
            offset: 0,
        }
    }
}

/// The entry type archive traversals hand to their context: a member plus,
/// while it is being consumed, a reader over its data.
///
/// The data reader is only attached during [`Context::consume`]. Checking
/// and comparing see the member alone.
pub struct ArchiveEntry<'s> {
    pub member: Member,
    data: Option<&'s mut dyn Read>,
}

impl<'s> ArchiveEntry<'s> {
    pub fn new(member: Member) -> Self {
        Self { member, data: None }
    }

    pub fn with_data(member: Member, data: &'s mut dyn Read) -> Self {
        Self {
            member,
            data: Some(data),
        }
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// The member's data. Valid for the duration of the consume call only.
    pub fn data(&mut self) -> Option<&mut (dyn Read + 's)> {
        self.data.as_deref_mut()
    }

    /// Read the whole member. Empty when no data is attached.
    pub fn read_to_end(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(data) = self.data() {
            data.read_to_end(&mut buf)?;
        }
        Ok(buf)
    }
}

impl std::fmt::Debug for ArchiveEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("member", &self.member)
            .field("data", &self.data.is_some())
            .finish()
    }
}

/// A [`Context`] for archive traversals, whatever the data lifetime.
///
/// Blanket-implemented for every type that implements
/// `Context<ArchiveEntry<'s>>` for all `'s`.
pub trait ArchiveContext: for<'s> Context<ArchiveEntry<'s>> {}

impl<C: ?Sized + for<'s> Context<ArchiveEntry<'s>>> ArchiveContext for C {}

pub(crate) trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

enum Stream<'a> {
    Tar(Box<dyn ReadSeek + 'a>),
    Zip(ZipArchive<Box<dyn ReadSeek + 'a>>),
    Forward(Box<dyn Read + 'a>),
}

/// An opened archive, positioned before its first member.
pub struct Archive<'a> {
    label: Arc<Path>,
    format: Format,
    stream: Stream<'a>,
    next_header: u64,
    index: usize,
}

impl<'a> Archive<'a> {
    /// Whether a file of this name can be opened at all.
    pub fn can_handle(name: impl AsRef<Path>) -> bool {
        Format::from_name(name).is_some()
    }

    /// Open a forward-only archive over `reader`.
    pub fn open(name: impl AsRef<Path>, reader: impl Read + 'a) -> Result<Self, FindError> {
        let name = name.as_ref();
        let format = resolve(name)?;
        let stream = Stream::Forward(forward(name, format, reader)?);
        Ok(Self::with_stream(name, format, stream))
    }

    /// Open an archive over a reader that can seek. The result is seekable
    /// when the format allows it.
    pub fn open_seekable(name: impl AsRef<Path>, mut reader: impl Read + Seek + 'a) -> Result<Self, FindError> {
        let name = name.as_ref();
        let format = resolve(name)?;
        if !format.is_seekable() {
            let stream = Stream::Forward(forward(name, format, reader)?);
            return Ok(Self::with_stream(name, format, stream));
        }

        if format.container == Container::Zip {
            let reader: Box<dyn ReadSeek + 'a> = Box::new(reader);
            let zip = ZipArchive::new(reader).map_err(|e| archive_error(name, io::Error::other(e)))?;
            return Ok(Self::with_stream(name, format, Stream::Zip(zip)));
        }

        let start = reader
            .stream_position()
            .map_err(|source| archive_error(name, source))?;
        let mut archive = Self::with_stream(name, format, Stream::Tar(Box::new(reader)));
        archive.next_header = start;

        // Reject garbage now rather than mid-traversal.
        archive
            .read_header(start)
            .map_err(|source| archive_error(name, source))?;
        Ok(archive)
    }

    /// Open the archive file at `path`.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Archive<'static>, FindError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FindError::from_io(path, e))?;
        Archive::open_seekable(path, BufReader::new(file))
    }

    fn with_stream(name: &Path, format: Format, stream: Stream<'a>) -> Self {
        Self {
            label: Arc::from(name),
            format,
            stream,
            next_header: 0,
            index: 0,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The name the archive was opened under.
    pub fn label(&self) -> &Path {
        &self.label
    }

    pub fn is_seekable(&self) -> bool {
        !matches!(self.stream, Stream::Forward(_))
    }

    /// Read the tar header at `at` without advancing. Seekable tars only.
    fn read_header(&mut self, at: u64) -> io::Result<Option<Member>> {
        let Stream::Tar(reader) = &mut self.stream else {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "archive is not seekable"));
        };
        reader.seek(SeekFrom::Start(at))?;
        let mut tar = tar::Archive::new(&mut **reader);
        let mut entries = tar.entries()?;
        match entries.next() {
            None => Ok(None),
            Some(entry) => Member::read(&entry?, &self.label, at, self.index).map(Some),
        }
    }

    /// Read the next member header and move past its data. Seekable
    /// archives only.
    pub(crate) fn next_header(&mut self) -> io::Result<Option<Member>> {
        if let Stream::Zip(zip) = &mut self.stream {
            if self.index >= zip.len() {
                return Ok(None);
            }
            let file = zip.by_index(self.index).map_err(io::Error::other)?;
            let member = Member::zipped(&self.label, self.index, file.name(), file.is_dir(), file.size());
            drop(file);
            self.index += 1;
            return Ok(Some(member));
        }

        let member = self.read_header(self.next_header)?;
        if let Some(member) = &member {
            self.next_header = member.offset + padded(member.size);
            self.index += 1;
        }
        Ok(member)
    }

    /// Reposition on a member read earlier and return a reader over its
    /// data. Seekable archives only.
    pub(crate) fn open_member(&mut self, member: &Member) -> io::Result<Box<dyn Read + '_>> {
        match &mut self.stream {
            Stream::Tar(reader) => {
                reader.seek(SeekFrom::Start(member.offset))?;
                Ok(Box::new((&mut **reader).take(member.size)))
            }
            Stream::Zip(zip) => {
                let file = zip.by_index(member.index).map_err(io::Error::other)?;
                Ok(Box::new(file))
            }
            Stream::Forward(_) => Err(io::Error::new(io::ErrorKind::Unsupported, "archive is not seekable")),
        }
    }

    /// Read the next member and hand it, with its data, to `visit`. Whatever
    /// `visit` leaves unread is skipped. Returns `false` at the end of the
    /// archive. Forward-only archives only.
    pub(crate) fn next_streamed(&mut self, visit: impl FnOnce(Member, &mut dyn Read)) -> io::Result<bool> {
        let Stream::Forward(reader) = &mut self.stream else {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "archive is seekable"));
        };

        if self.format.container == Container::Zip {
            let Some(mut file) = zip::read::read_zipfile_from_stream(reader).map_err(io::Error::other)? else {
                return Ok(false);
            };
            let member = Member::zipped(&self.label, self.index, file.name(), file.is_dir(), file.size());
            visit(member, &mut file);
            io::copy(&mut file, &mut io::sink())?;
            drop(file);
            self.index += 1;
            return Ok(true);
        }

        let padding = {
            let mut tar = tar::Archive::new(&mut **reader);
            let mut entries = tar.entries()?;
            let Some(entry) = entries.next() else {
                return Ok(false);
            };
            let mut entry = entry?;
            let member = Member::read(&entry, &self.label, 0, self.index)?;
            let size = member.size;

            visit(member, &mut entry);
            io::copy(&mut entry, &mut io::sink())?;
            padded(size) - size
        };

        io::copy(&mut (&mut **reader).take(padding), &mut io::sink())?;
        self.index += 1;
        Ok(true)
    }
}

impl std::fmt::Debug for Archive<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("label", &self.label)
            .field("format", &self.format)
            .field("seekable", &self.is_seekable())
            .finish()
    }
}

fn resolve(name: &Path) -> Result<Format, FindError> {
    Format::from_name(name).ok_or_else(|| FindError::UnsupportedFormat(name.to_string_lossy().into_owned()))
}

fn forward<'a>(name: &Path, format: Format, reader: impl Read + 'a) -> Result<Box<dyn Read + 'a>, FindError> {
    let mut reader = BufReader::new(reader);
    let head = reader.fill_buf().map_err(|source| archive_error(name, source))?;
    if !format.compression.check_magic_bytes(head) {
        debug!(archive = %name.display(), %format, "magic bytes do not match");
        return Err(archive_error(
            name,
            io::Error::new(io::ErrorKind::InvalidData, format!("not a {format} stream")),
        ));
    }
    Ok(format.compression.wrap_reader(reader))
}

fn archive_error(name: &Path, source: io::Error) -> FindError {
    FindError::Archive {
        path: name.to_path_buf(),
        source,
    }
}

fn padded(size: u64) -> u64 {
    size.div_ceil(BLOCK) * BLOCK
}
