//! Tracking-file data model.
//!
//! A tracking file lists one managed path per line as `path|type`.  Blank
//! lines and `#` comments are skipped, and an unknown or missing type reads
//! as [`LinkType::Soft`], so older and newer files stay readable.
//!
//! [`TrackingCache`] memoizes the parsed file keyed by path, modification
//! time and length; any external edit that changes either invalidates it.

use std::fmt;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::fs::FsError;

/// How a managed path is linked back to its repository copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Symbolic link (the default; works for files and directories).
    #[default]
    Soft,
    /// Hard link sharing the repository file's inode (files only).
    Hard,
}

impl LinkType {
    /// On-disk token: `soft` or `hard`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }

    /// Tolerant parse used when reading tracking files.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        token.parse().unwrap_or_default()
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soft" | "symlink" => Ok(Self::Soft),
            "hard" | "hardlink" => Ok(Self::Hard),
            other => Err(format!("unknown link type '{other}' (expected soft or hard)")),
        }
    }
}

/// One managed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TrackedEntry {
    /// Tracking key: home-relative when possible, absolute otherwise.
    pub path: String,
    /// Link kind recorded at add time.
    pub link_type: LinkType,
}

impl TrackedEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(path: impl Into<String>, link_type: LinkType) -> Self {
        Self {
            path: path.into(),
            link_type,
        }
    }
}

/// Why `key` cannot be stored in a tracking file, if it cannot.
///
/// A stored key must read back as itself: [`parse`] trims lines, treats
/// `#` as a comment and splits on the first `|`.
#[must_use]
pub fn key_problem(key: &str) -> Option<&'static str> {
    if key.is_empty() {
        Some("empty path")
    } else if key.starts_with('#') {
        Some("path starts with '#'")
    } else if key.contains('|') {
        Some("path contains '|'")
    } else if key.contains(['\n', '\r']) {
        Some("path contains a line break")
    } else if key.trim() != key {
        Some("path starts or ends with whitespace")
    } else {
        None
    }
}

/// Parse tracking-file content.  Duplicate keys keep their first occurrence.
#[must_use]
pub fn parse(content: &str) -> Vec<TrackedEntry> {
    let mut entries: Vec<TrackedEntry> = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (path, token) = line.split_once('|').unwrap_or((line, ""));
        let path = path.trim();
        if path.is_empty() {
            continue;
        }
        if entries.iter().any(|e| e.path == path) {
            tracing::debug!(path, "duplicate tracking entry ignored");
            continue;
        }
        entries.push(TrackedEntry::new(path, LinkType::from_token(token)));
    }
    entries
}

/// Serialize entries, one `path|type` line each, newline-terminated.
#[must_use]
pub fn serialize(entries: &[TrackedEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}|{}\n", e.path, e.link_type))
        .collect()
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CacheSlot {
    path: PathBuf,
    modified: Option<SystemTime>,
    len: u64,
    entries: Vec<TrackedEntry>,
}

impl CacheSlot {
    fn matches(&self, path: &Path, meta: &Metadata) -> bool {
        self.path == path && self.modified == meta.modified().ok() && self.len == meta.len()
    }
}

/// Process-local memo of the last tracking file read or written.
#[derive(Debug, Default)]
pub struct TrackingCache {
    slot: Mutex<Option<CacheSlot>>,
}

impl TrackingCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entries for `path`, if its metadata is unchanged.
    #[must_use]
    pub fn get(&self, path: &Path, meta: &Metadata) -> Option<Vec<TrackedEntry>> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref()
            .filter(|s| s.matches(path, meta))
            .map(|s| s.entries.clone())
    }

    /// Remember `entries` as the content of `path` at `meta`.
    pub fn store(&self, path: &Path, meta: &Metadata, entries: Vec<TrackedEntry>) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(CacheSlot {
            path: path.to_path_buf(),
            modified: meta.modified().ok(),
            len: meta.len(),
            entries,
        });
    }

    /// Drop whatever is cached.
    pub fn invalidate(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Read the tracking file at `path`.  A missing file yields no entries.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_entries(path: &Path, cache: &TrackingCache) -> Result<Vec<TrackedEntry>, FsError> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(FsError::Io {
                operation: "stat",
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if let Some(entries) = cache.get(path, &meta) {
        return Ok(entries);
    }
    let content = fs::read_to_string(path).map_err(|source| FsError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source,
    })?;
    let entries = parse(&content);
    cache.store(path, &meta, entries.clone());
    Ok(entries)
}

/// Replace the tracking file at `path` with `entries`.
///
/// The content is written to a sibling temp file and renamed into place so a
/// crash never leaves a truncated tracking file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_entries(
    path: &Path,
    entries: &[TrackedEntry],
    cache: &TrackingCache,
) -> Result<(), FsError> {
    let io_err = |operation: &'static str, p: &Path| {
        let p = p.to_path_buf();
        move |source| FsError::Io {
            operation,
            path: p,
            source,
        }
    };

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push("~");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, serialize(entries)).map_err(io_err("write", &tmp))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err("rename", path)(e));
    }

    match fs::metadata(path) {
        Ok(meta) => cache.store(path, &meta, entries.to_vec()),
        Err(_) => cache.invalidate(),
    }
    Ok(())
}
