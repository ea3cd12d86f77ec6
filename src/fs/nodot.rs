//! Store decorator that hides dot files.
//!
//! Opening any path with a segment starting with `.` is refused before the
//! inner store is touched, and directory listings never contain dot entries.

use std::io::{self, Read, Seek, SeekFrom};

use super::{FileHandle, FileInfo, FileStore, FsError, ListError};
use crate::path_utils::{is_hidden, is_hidden_name};

#[derive(Clone, Debug)]
pub struct NoDotStore<S> {
    inner: S,
}

impl<S: FileStore> NoDotStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: FileStore> FileStore for NoDotStore<S> {
    type Handle = NoDotHandle<S::Handle>;

    fn open(&self, path: &str) -> Result<Self::Handle, FsError> {
        if is_hidden(path) {
            tracing::debug!(path, "refusing hidden path");
            return Err(FsError::PermissionDenied);
        }
        let inner = self.inner.open(path)?;
        Ok(NoDotHandle { inner })
    }
}

/// Handle returned by [`NoDotStore`]. Everything except listing is passed
/// straight to the wrapped handle.
#[derive(Debug)]
pub struct NoDotHandle<H> {
    inner: H,
}

fn visible(entries: Vec<FileInfo>) -> impl Iterator<Item = FileInfo> {
    entries.into_iter().filter(|e| !is_hidden_name(&e.name))
}

impl<H: FileHandle> FileHandle for NoDotHandle<H> {
    fn stat(&self) -> Result<FileInfo, FsError> {
        self.inner.stat()
    }

    // Hidden entries would otherwise eat into `limit`, so keep asking the
    // inner handle for exactly the shortfall until it is met or the
    // directory runs out.
    fn list_entries(&mut self, limit: usize) -> Result<Vec<FileInfo>, ListError> {
        let mut out = Vec::new();
        loop {
            let want = if limit == 0 { 0 } else { limit - out.len() };
            match self.inner.list_entries(want) {
                Ok(batch) => {
                    let exhausted = batch.is_empty();
                    out.extend(visible(batch));
                    if limit == 0 || exhausted || out.len() >= limit {
                        return Ok(out);
                    }
                }
                Err(err) => {
                    out.extend(visible(err.entries));
                    return Err(ListError {
                        entries: out,
                        source: err.source,
                    });
                }
            }
        }
    }
}

impl<H: Read> Read for NoDotHandle<H> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<H: Seek> Seek for NoDotHandle<H> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn info(name: &str, is_dir: bool) -> FileInfo {
        FileInfo {
            name: name.to_string(),
            len: 0,
            modified: None,
            is_dir,
        }
    }

    /// In-memory store that counts opens and records every listing request.
    #[derive(Default)]
    struct MemStore {
        files: HashMap<String, Vec<u8>>,
        dirs: HashMap<String, Vec<FileInfo>>,
        fail_at: Option<usize>,
        opens: Arc<AtomicUsize>,
        requests: Arc<std::sync::Mutex<Vec<usize>>>,
    }

    struct MemHandle {
        info: FileInfo,
        data: Cursor<Vec<u8>>,
        entries: Vec<FileInfo>,
        pos: usize,
        fail_at: Option<usize>,
        requests: Arc<std::sync::Mutex<Vec<usize>>>,
    }

    impl FileStore for MemStore {
        type Handle = MemHandle;

        fn open(&self, path: &str) -> Result<MemHandle, FsError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let (info, data, entries) = if let Some(data) = self.files.get(path) {
                (info(path, false), data.clone(), Vec::new())
            } else if let Some(entries) = self.dirs.get(path) {
                (info(path, true), Vec::new(), entries.clone())
            } else {
                return Err(FsError::NotFound);
            };
            Ok(MemHandle {
                info,
                data: Cursor::new(data),
                entries,
                pos: 0,
                fail_at: self.fail_at,
                requests: self.requests.clone(),
            })
        }
    }

    impl Read for MemHandle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.data.read(buf)
        }
    }

    impl Seek for MemHandle {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.data.seek(pos)
        }
    }

    impl FileHandle for MemHandle {
        fn stat(&self) -> Result<FileInfo, FsError> {
            Ok(self.info.clone())
        }

        fn list_entries(&mut self, limit: usize) -> Result<Vec<FileInfo>, ListError> {
            self.requests.lock().unwrap().push(limit);
            let end = if limit == 0 {
                self.entries.len()
            } else {
                (self.pos + limit).min(self.entries.len())
            };
            let mut out = Vec::new();
            while self.pos < end {
                if self.fail_at == Some(self.pos) {
                    self.fail_at = None;
                    return Err(ListError {
                        entries: out,
                        source: FsError::Io(io::Error::other("disk on fire")),
                    });
                }
                out.push(self.entries[self.pos].clone());
                self.pos += 1;
            }
            Ok(out)
        }
    }

    fn names(entries: &[FileInfo]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn store_with_root(entries: &[&str]) -> MemStore {
        let mut store = MemStore::default();
        store.dirs.insert(
            "/".to_string(),
            entries.iter().map(|n| info(n, false)).collect(),
        );
        store
    }

    #[test]
    fn hidden_paths_never_reach_inner_store() {
        let inner = store_with_root(&["a.txt"]);
        let opens = inner.opens.clone();
        let fs = NoDotStore::new(inner);
        for p in ["/.env", "/.secret/key.txt", "dir/.hidden", ".hidden/file.txt"] {
            assert!(matches!(fs.open(p), Err(FsError::PermissionDenied)));
        }
        assert_eq!(opens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn inner_errors_pass_through() {
        let fs = NoDotStore::new(MemStore::default());
        assert!(matches!(fs.open("/missing"), Err(FsError::NotFound)));
        assert_eq!(fs.inner().opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn file_reads_match_inner_store() {
        let mut inner = MemStore::default();
        inner
            .files
            .insert("/a.txt".to_string(), b"hello world".to_vec());
        let fs = NoDotStore::new(inner);

        let mut direct = fs.inner().open("/a.txt").unwrap();
        let mut wrapped = fs.open("/a.txt").unwrap();
        assert_eq!(wrapped.stat().unwrap(), direct.stat().unwrap());

        wrapped.seek(SeekFrom::Start(6)).unwrap();
        direct.seek(SeekFrom::Start(6)).unwrap();
        let (mut a, mut b) = (String::new(), String::new());
        wrapped.read_to_string(&mut a).unwrap();
        direct.read_to_string(&mut b).unwrap();
        assert_eq!(a, "world");
        assert_eq!(a, b);
    }

    #[test]
    fn listing_drops_dot_entries_in_order() {
        let fs = NoDotStore::new(store_with_root(&[".git", "a.txt", ".hidden", "b.txt"]));
        let mut dir = fs.open("/").unwrap();
        assert_eq!(names(&dir.list_entries(0).unwrap()), ["a.txt", "b.txt"]);

        let fs = NoDotStore::new(store_with_root(&["b.txt", ".hidden", "a.txt", ".git"]));
        let mut dir = fs.open("/").unwrap();
        assert_eq!(names(&dir.list_entries(0).unwrap()), ["b.txt", "a.txt"]);
    }

    #[test]
    fn limited_listing_fills_up_past_hidden_entries() {
        let inner = store_with_root(&[".a", ".b", "c", ".d", "e", "f"]);
        let requests = inner.requests.clone();
        let fs = NoDotStore::new(inner);
        let mut dir = fs.open("/").unwrap();

        assert_eq!(names(&dir.list_entries(2).unwrap()), ["c", "e"]);
        assert_eq!(*requests.lock().unwrap(), [2, 2, 1]);

        assert_eq!(names(&dir.list_entries(2).unwrap()), ["f"]);
        assert!(dir.list_entries(2).unwrap().is_empty());
    }

    #[test]
    fn listing_error_keeps_visible_partial_entries() {
        let mut inner = store_with_root(&["a", ".b", "c", ".d", "e"]);
        inner.fail_at = Some(3);
        let fs = NoDotStore::new(inner);
        let mut dir = fs.open("/").unwrap();

        let err = dir.list_entries(0).unwrap_err();
        assert_eq!(names(&err.entries), ["a", "c"]);
        assert!(matches!(err.source, FsError::Io(_)));

        // The failure is not sticky in the inner handle; the rest follows.
        assert_eq!(names(&dir.list_entries(0).unwrap()), ["e"]);
    }

    #[test]
    fn listing_error_across_batches_keeps_earlier_batches() {
        let mut inner = store_with_root(&["a", ".b", ".c", "d", "e"]);
        inner.fail_at = Some(4);
        let fs = NoDotStore::new(inner);
        let mut dir = fs.open("/").unwrap();

        let err = dir.list_entries(3).unwrap_err();
        assert_eq!(names(&err.entries), ["a", "d"]);
    }
}
