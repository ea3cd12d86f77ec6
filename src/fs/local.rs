//! [`FileStore`] backed by a directory on the host file system.

use std::fs::{self, File, ReadDir};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;

use super::{FileHandle, FileInfo, FileStore, FsError, ListError};
use crate::path_utils::clean;

#[derive(Clone, Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let mut full = self.root.clone();
        full.extend(clean(path).split('/').filter(|s| !s.is_empty()));
        full
    }
}

impl FileStore for LocalStore {
    type Handle = LocalHandle;

    fn open(&self, path: &str) -> Result<LocalHandle, FsError> {
        if std::path::MAIN_SEPARATOR != '/' && path.contains(std::path::MAIN_SEPARATOR) {
            return Err(FsError::NotFound);
        }
        let full = self.resolve(path);
        let meta = fs::metadata(&full)?;
        let name = full
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());
        let kind = if meta.is_dir() {
            Kind::Dir(fs::read_dir(&full)?)
        } else {
            Kind::File(File::open(&full)?)
        };
        Ok(LocalHandle {
            path: full,
            name,
            kind,
        })
    }
}

#[derive(Debug)]
enum Kind {
    File(File),
    Dir(ReadDir),
}

#[derive(Debug)]
pub struct LocalHandle {
    path: PathBuf,
    name: String,
    kind: Kind,
}

fn is_a_directory() -> io::Error {
    io::Error::other("is a directory")
}

impl Read for LocalHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.kind {
            Kind::File(f) => f.read(buf),
            Kind::Dir(_) => Err(is_a_directory()),
        }
    }
}

impl Seek for LocalHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.kind {
            Kind::File(f) => f.seek(pos),
            Kind::Dir(_) => Err(is_a_directory()),
        }
    }
}

impl FileHandle for LocalHandle {
    fn stat(&self) -> Result<FileInfo, FsError> {
        let meta = match &self.kind {
            Kind::File(f) => f.metadata()?,
            Kind::Dir(_) => fs::metadata(&self.path)?,
        };
        Ok(FileInfo {
            name: self.name.clone(),
            len: meta.len(),
            modified: meta.modified().ok(),
            is_dir: meta.is_dir(),
        })
    }

    fn list_entries(&mut self, limit: usize) -> Result<Vec<FileInfo>, ListError> {
        let Kind::Dir(iter) = &mut self.kind else {
            return Err(FsError::NotADirectory.into());
        };
        let mut out = Vec::new();
        while limit == 0 || out.len() < limit {
            let Some(entry) = iter.next() else { break };
            let (name, meta) = match entry.and_then(|e| Ok((e.file_name(), e.metadata()?))) {
                Ok(found) => found,
                Err(err) => {
                    return Err(ListError {
                        entries: out,
                        source: err.into(),
                    });
                }
            };
            out.push(FileInfo {
                name: name.to_string_lossy().into_owned(),
                len: meta.len(),
                modified: meta.modified().ok(),
                is_dir: meta.is_dir(),
            });
        }
        Ok(out)
    }
}
