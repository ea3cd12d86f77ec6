//! File store capability used by the server.
//!
//! A [`FileStore`] resolves slash-separated logical paths to open
//! [`FileHandle`]s. Stores compose: [`NoDotStore`] wraps any other store and
//! hides dot files, [`LocalStore`] serves a directory on the host.

pub mod local;
pub mod nodot;

use std::io::{self, Read, Seek};
use std::time::SystemTime;

pub use local::{LocalHandle, LocalStore};
pub use nodot::{NoDotHandle, NoDotStore};

/// Name and metadata of a file or directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("entry not found")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("io error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound,
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied,
            _ => FsError::Io(err),
        }
    }
}

/// A listing that failed part way. `entries` holds what was read before the
/// failure.
#[derive(Debug, thiserror::Error)]
#[error("listing failed after {} entries: {source}", .entries.len())]
pub struct ListError {
    pub entries: Vec<FileInfo>,
    #[source]
    pub source: FsError,
}

impl From<FsError> for ListError {
    fn from(source: FsError) -> Self {
        ListError {
            entries: Vec::new(),
            source,
        }
    }
}

pub trait FileStore: Send + Sync {
    type Handle: FileHandle + 'static;

    fn open(&self, path: &str) -> Result<Self::Handle, FsError>;
}

/// An open file or directory. Dropping the handle closes it.
pub trait FileHandle: Read + Seek + Send {
    fn stat(&self) -> Result<FileInfo, FsError>;

    /// Returns up to `limit` further directory entries, or all remaining ones
    /// when `limit` is 0. An exhausted directory yields an empty vector.
    fn list_entries(&mut self, limit: usize) -> Result<Vec<FileInfo>, ListError>;
}
