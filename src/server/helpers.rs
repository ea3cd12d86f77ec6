use std::io::{self, SeekFrom};
use std::time::SystemTime;

use axum::body::{Body, Bytes};
use chrono::{DateTime, Utc};
use tokio_stream::wrappers::ReceiverStream;

use crate::fs::{FileHandle, FileInfo, FileStore, FsError};
use crate::path_utils;

use super::state::INDEX_PAGE;

const CHUNK_SIZE: usize = 64 * 1024;
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Outcome of looking a request path up in a store.
#[derive(Debug)]
pub enum Resolved<H> {
    File { handle: H, info: FileInfo },
    Listing(Vec<FileInfo>),
    /// Directory requested without its trailing slash.
    AddSlash,
    /// File requested with a trailing slash.
    StripSlash,
}

/// Decodes a raw URL path into a cleaned logical path.
pub fn logical_path(raw: &str) -> Result<String, ()> {
    let decoded = urlencoding::decode(raw).map_err(|_| ())?;
    if decoded.contains('\0') {
        return Err(());
    }
    Ok(path_utils::clean(&decoded))
}

/// Last segment of a cleaned logical path, ignoring a trailing slash.
pub fn base_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Resolves `path` against `store`. Blocking; run it off the async runtime.
pub fn resolve<S: FileStore>(store: &S, path: &str) -> Result<Resolved<S::Handle>, FsError> {
    let mut handle = store.open(path)?;
    let info = handle.stat()?;
    if !info.is_dir {
        if path.ends_with('/') {
            return Ok(Resolved::StripSlash);
        }
        return Ok(Resolved::File { handle, info });
    }
    if !path.ends_with('/') {
        return Ok(Resolved::AddSlash);
    }

    let index = format!("{path}{INDEX_PAGE}");
    if let Ok(index_handle) = store.open(&index)
        && let Ok(index_info) = index_handle.stat()
        && !index_info.is_dir
    {
        return Ok(Resolved::File {
            handle: index_handle,
            info: index_info,
        });
    }

    let mut entries = handle.list_entries(0).map_err(|err| {
        tracing::warn!(path, partial = err.entries.len(), "directory listing failed");
        err.source
    })?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Resolved::Listing(entries))
}

#[derive(Debug, PartialEq, Eq)]
pub enum ByteRange {
    Full,
    /// Inclusive bounds.
    Partial { start: u64, end: u64 },
    Unsatisfiable,
}

/// Interprets a `Range` header against a file of `size` bytes.
///
/// Only a single `bytes=` range is honoured. Multiple ranges, other units
/// and malformed values fall back to the full body.
pub fn byte_range(header: Option<&str>, size: u64) -> ByteRange {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((first, last)) = spec.trim().split_once('-') else {
        return ByteRange::Full;
    };
    if first.is_empty() {
        return match last.parse::<u64>() {
            Ok(0) => ByteRange::Unsatisfiable,
            Ok(_) if size == 0 => ByteRange::Unsatisfiable,
            Ok(n) => ByteRange::Partial {
                start: size.saturating_sub(n),
                end: size - 1,
            },
            Err(_) => ByteRange::Full,
        };
    }
    let Ok(start) = first.parse::<u64>() else {
        return ByteRange::Full;
    };
    if start >= size {
        return ByteRange::Unsatisfiable;
    }
    let end = if last.is_empty() {
        size - 1
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => end.min(size - 1),
            _ => return ByteRange::Full,
        }
    };
    ByteRange::Partial { start, end }
}

pub fn http_date(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).format(HTTP_DATE).to_string()
}

/// True when `modified` is no later than the `If-Modified-Since` value, at
/// one-second resolution. Unparseable values never match.
pub fn not_modified_since(modified: SystemTime, since: &str) -> bool {
    DateTime::parse_from_rfc2822(since.trim())
        .is_ok_and(|since| DateTime::<Utc>::from(modified).timestamp() <= since.timestamp())
}

/// Streams `len` bytes starting at `start` out of `handle`. Reads happen on
/// the blocking pool; the handle is dropped when the body ends or the client
/// goes away.
pub fn stream_body<H: FileHandle + 'static>(mut handle: H, start: u64, len: u64) -> Body {
    let (tx, rx) = tokio::sync::mpsc::channel::<io::Result<Bytes>>(4);
    tokio::task::spawn_blocking(move || {
        if let Err(err) = handle.seek(SeekFrom::Start(start)) {
            let _ = tx.blocking_send(Err(err));
            return;
        }
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut remaining = len;
        while remaining > 0 {
            let want = remaining.min(CHUNK_SIZE as u64) as usize;
            match handle.read(&mut buf[..want]) {
                Ok(0) => break,
                Ok(n) => {
                    remaining -= n as u64;
                    if tx
                        .blocking_send(Ok(Bytes::copy_from_slice(&buf[..n])))
                        .is_err()
                    {
                        break;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    tracing::error!(error = %err, "file read failed mid-body");
                    let _ = tx.blocking_send(Err(err));
                    break;
                }
            }
        }
    });
    Body::from_stream(ReceiverStream::new(rx))
}
