//! Filesystem primitives for dependency injection.
//!
//! The engine never touches [`std::fs`] for mutations directly; it goes
//! through the [`FileSystemOps`] trait so transactional steps can be forced
//! to fail in tests.  Production code uses [`SystemFileSystemOps`].
//!
//! The free functions at the bottom ([`expand_home`], [`clean_path`],
//! [`resolve_link_target`], [`paths_equal`]) are pure path helpers shared by
//! the engine and the trait implementation.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Errors produced by filesystem primitives.
#[derive(Error, Debug)]
pub enum FsError {
    /// The path does not exist.
    #[error("path does not exist: {path}")]
    NotFound {
        /// Missing path.
        path: PathBuf,
    },

    /// The path exists but is not readable or writable.
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// Inaccessible path.
        path: PathBuf,
    },

    /// The path has a type the operation cannot handle.
    #[error("unsupported file type at {path}: {reason}")]
    Unsupported {
        /// Offending path.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// `read_link` was called on something that is not a symlink.
    #[error("not a symlink: {path}")]
    InvalidSymlink {
        /// Path that could not be read as a link.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// An I/O call failed.
    #[error("{operation} failed for {path}")]
    Io {
        /// Short name of the failed call (`rename`, `symlink`, ...).
        operation: &'static str,
        /// Path the call was made on.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Shorthand for mapping an [`io::Error`] into [`FsError::Io`].
///
/// `NotFound` keeps its own variant so callers can match on it.
fn io_err<'a>(
    operation: &'static str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> FsError + 'a {
    move |source| match source.kind() {
        io::ErrorKind::NotFound => FsError::NotFound {
            path: path.to_path_buf(),
        },
        _ => FsError::Io {
            operation,
            path: path.to_path_buf(),
            source,
        },
    }
}

/// Result alias for filesystem primitives.
pub type FsResult<T> = Result<T, FsError>;

/// Filesystem primitives consumed by the engine.
///
/// Implement this trait to substitute failure-injecting wrappers in tests.
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Check that `path` can be brought under management.
    ///
    /// # Errors
    ///
    /// [`FsError::NotFound`] if the path is empty or missing,
    /// [`FsError::Unsupported`] if it is neither a regular file nor a
    /// directory, [`FsError::PermissionDenied`] for a regular file without
    /// the owner read bit.
    fn validate_for_add(&self, path: &Path) -> FsResult<()>;

    /// Move `src` to `dst`, creating the destination parent.
    ///
    /// Same-device moves use `rename` and are atomic.  Across devices this
    /// degrades to copy-then-delete, which is not crash-atomic.  A symlinked
    /// `src` is materialized: the target's content lands at `dst` and the
    /// link is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of the move fails; a partially copied
    /// destination is removed before returning.
    fn move_path(&self, src: &Path, dst: &Path) -> FsResult<()>;

    /// Create a symlink at `link` pointing to `target`.
    ///
    /// The stored link text is relative to the link's directory whenever
    /// one can be computed.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is missing or the link cannot be created.
    fn create_symlink(&self, target: &Path, link: &Path) -> FsResult<()>;

    /// Create a symlink at `link` storing exactly `raw` as its text.
    ///
    /// Used to put back a user's own link, whose text may be relative to
    /// somewhere other than the repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be created.
    fn restore_symlink(&self, raw: &Path, link: &Path) -> FsResult<()>;

    /// Create a hardlink at `link` sharing `target`'s inode.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is missing or a directory, or the link
    /// cannot be created.
    fn create_hardlink(&self, target: &Path, link: &Path) -> FsResult<()>;

    /// `true` if `path` resolves (following links) to a file or directory.
    fn exists(&self, path: &Path) -> bool;

    /// `true` if `path` resolves to a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// `true` if `path` itself is a symlink, dangling or not.
    fn is_symlink(&self, path: &Path) -> bool;

    /// Raw text of the symlink at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidSymlink`] if `path` is not a readable link.
    fn read_link(&self, path: &Path) -> FsResult<PathBuf>;

    /// Metadata of `path`, following links.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::NotFound`] or [`FsError::Io`].
    fn metadata(&self, path: &Path) -> FsResult<Metadata>;

    /// Remove a file or symlink (never follows the link).
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    fn remove_file(&self, path: &Path) -> FsResult<()>;

    /// Remove a directory tree.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    fn remove_dir_all(&self, path: &Path) -> FsResult<()>;

    /// Paths of the entries directly inside `path`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    fn list_dir(&self, path: &Path) -> FsResult<Vec<PathBuf>>;

    /// Create `path` and any missing ancestors.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    fn ensure_dir(&self, path: &Path) -> FsResult<()>;

    /// `true` if `a` and `b` are the same inode on the same device.
    fn is_hardlink_to(&self, a: &Path, b: &Path) -> bool;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFileSystemOps;

impl SystemFileSystemOps {
    fn ensure_parent(path: &Path) -> FsResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err("create_dir_all", parent))?;
        }
        Ok(())
    }

    fn copy_then_delete(src: &Path, dst: &Path) -> FsResult<()> {
        let meta = fs::metadata(src).map_err(io_err("stat", src))?;
        if meta.is_dir() {
            copy_dir_recursive(src, dst)?;
        } else {
            fs::copy(src, dst).map_err(io_err("copy", src))?;
        }
        if let Err(err) = remove_any(src) {
            let _ = remove_any(dst);
            return Err(err);
        }
        Ok(())
    }
}

impl FileSystemOps for SystemFileSystemOps {
    fn validate_for_add(&self, path: &Path) -> FsResult<()> {
        if path.as_os_str().is_empty() {
            return Err(FsError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let meta = fs::metadata(path).map_err(io_err("stat", path))?;
        if !meta.is_file() && !meta.is_dir() {
            return Err(FsError::Unsupported {
                path: path.to_path_buf(),
                reason: "not a regular file or directory".to_string(),
            });
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            if meta.is_file() && meta.permissions().mode() & 0o400 == 0 {
                return Err(FsError::PermissionDenied {
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    fn move_path(&self, src: &Path, dst: &Path) -> FsResult<()> {
        Self::ensure_parent(dst)?;
        let meta = fs::symlink_metadata(src).map_err(io_err("lstat", src))?;

        if meta.file_type().is_symlink() {
            // Materialize: copy what the link points at, then drop the link.
            let raw = fs::read_link(src).map_err(io_err("readlink", src))?;
            let target = resolve_link_target(src, &raw);
            let target_meta = fs::metadata(&target).map_err(io_err("stat", &target))?;
            if target_meta.is_dir() {
                copy_dir_recursive(&target, dst)?;
            } else {
                fs::copy(&target, dst).map_err(io_err("copy", &target))?;
            }
            if let Err(err) = fs::remove_file(src).map_err(io_err("remove", src)) {
                let _ = remove_any(dst);
                return Err(err);
            }
            return Ok(());
        }

        match fs::rename(src, dst) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::debug!(src = %src.display(), dst = %dst.display(), "cross-device move, copying");
                Self::copy_then_delete(src, dst)
            }
            Err(e) => Err(io_err("rename", src)(e)),
        }
    }

    fn create_symlink(&self, target: &Path, link: &Path) -> FsResult<()> {
        let abs_target = absolute(target);
        if fs::metadata(&abs_target).is_err() {
            return Err(FsError::NotFound { path: abs_target });
        }
        Self::ensure_parent(link)?;

        let link_abs = absolute(link);
        let link_dir = link_abs.parent().unwrap_or_else(|| Path::new("/"));
        // Compute against physical paths so `..` segments resolve the same
        // way the kernel will walk them.
        let from = dunce::canonicalize(link_dir).unwrap_or_else(|_| link_dir.to_path_buf());
        let to = dunce::canonicalize(&abs_target).unwrap_or_else(|_| abs_target.clone());
        let stored = pathdiff::diff_paths(&to, &from).unwrap_or(to);

        symlink(&stored, link, abs_target.is_dir()).map_err(io_err("symlink", link))
    }

    fn restore_symlink(&self, raw: &Path, link: &Path) -> FsResult<()> {
        Self::ensure_parent(link)?;
        let is_dir = resolve_link_target(link, raw).is_dir();
        symlink(raw, link, is_dir).map_err(io_err("symlink", link))
    }

    fn create_hardlink(&self, target: &Path, link: &Path) -> FsResult<()> {
        let meta = fs::metadata(target).map_err(io_err("stat", target))?;
        if meta.is_dir() {
            return Err(FsError::Unsupported {
                path: target.to_path_buf(),
                reason: "hardlinks cannot point at directories".to_string(),
            });
        }
        Self::ensure_parent(link)?;
        fs::hard_link(target, link).map_err(io_err("hard_link", link))
    }

    fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
    }

    fn read_link(&self, path: &Path) -> FsResult<PathBuf> {
        fs::read_link(path).map_err(|source| FsError::InvalidSymlink {
            path: path.to_path_buf(),
            source,
        })
    }

    fn metadata(&self, path: &Path) -> FsResult<Metadata> {
        fs::metadata(path).map_err(io_err("stat", path))
    }

    fn remove_file(&self, path: &Path) -> FsResult<()> {
        remove_link_or_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> FsResult<()> {
        fs::remove_dir_all(path).map_err(io_err("remove_dir_all", path))
    }

    fn list_dir(&self, path: &Path) -> FsResult<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path)
            .map_err(io_err("read_dir", path))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<Vec<_>>>()
            .map_err(io_err("read_dir", path))?;
        entries.sort();
        Ok(entries)
    }

    fn ensure_dir(&self, path: &Path) -> FsResult<()> {
        fs::create_dir_all(path).map_err(io_err("create_dir_all", path))
    }

    #[cfg(unix)]
    fn is_hardlink_to(&self, a: &Path, b: &Path) -> bool {
        use std::os::unix::fs::MetadataExt as _;
        match (fs::symlink_metadata(a), fs::metadata(b)) {
            (Ok(ma), Ok(mb)) => ma.is_file() && ma.dev() == mb.dev() && ma.ino() == mb.ino(),
            _ => false,
        }
    }

    #[cfg(not(unix))]
    fn is_hardlink_to(&self, _a: &Path, _b: &Path) -> bool {
        false
    }
}

#[cfg(unix)]
fn symlink(stored: &Path, link: &Path, _is_dir: bool) -> io::Result<()> {
    std::os::unix::fs::symlink(stored, link)
}

#[cfg(windows)]
fn symlink(stored: &Path, link: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        std::os::windows::fs::symlink_dir(stored, link)
    } else {
        std::os::windows::fs::symlink_file(stored, link)
    }
}

/// Remove a symlink or file.  Directory symlinks on Windows need `remove_dir`.
fn remove_link_or_file(path: &Path) -> FsResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        #[cfg(windows)]
        Err(_) if fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink()) => {
            fs::remove_dir(path).map_err(io_err("remove_dir", path))
        }
        Err(e) => Err(io_err("remove", path)(e)),
    }
}

/// Remove whatever is at `path` without following a final symlink.
fn remove_any(path: &Path) -> FsResult<()> {
    let meta = fs::symlink_metadata(path).map_err(io_err("lstat", path))?;
    if meta.is_dir() {
        fs::remove_dir_all(path).map_err(io_err("remove_dir_all", path))
    } else {
        remove_link_or_file(path)
    }
}

/// Recursively copy a directory tree.  Nested symlinks are recreated with
/// the same link text rather than followed.
fn copy_dir_recursive(src: &Path, dst: &Path) -> FsResult<()> {
    fs::create_dir_all(dst).map_err(io_err("create_dir_all", dst))?;
    for entry in fs::read_dir(src).map_err(io_err("read_dir", src))? {
        let entry = entry.map_err(io_err("read_dir", src))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(io_err("lstat", &src_path))?;
        if file_type.is_symlink() {
            let raw = fs::read_link(&src_path).map_err(io_err("readlink", &src_path))?;
            symlink(&raw, &dst_path, src_path.is_dir()).map_err(io_err("symlink", &dst_path))?;
        } else if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).map_err(io_err("copy", &src_path))?;
        }
    }
    Ok(())
}

/// Absolute, lexically cleaned form of `path` relative to the current dir.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        clean_path(path)
    } else {
        let cwd = std::env::current_dir().unwrap_or_default();
        clean_path(&cwd.join(path))
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Expand a leading `~` or `~/` against `home`.  Other paths are returned
/// unchanged.
#[must_use]
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        home.to_path_buf()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(path)
    }
}

/// Lexically remove `.` and `..` components.  `..` at the root is dropped;
/// leading `..` of a relative path is kept.
#[must_use]
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Turn the raw text of a symlink at `link` into an absolute, cleaned path.
#[must_use]
pub fn resolve_link_target(link: &Path, raw_target: &Path) -> PathBuf {
    if raw_target.is_absolute() {
        return clean_path(raw_target);
    }
    let base = link.parent().unwrap_or_else(|| Path::new("."));
    clean_path(&base.join(raw_target))
}

/// Compare two paths after canonicalization, falling back to lexical
/// comparison for paths that do not exist.
#[must_use]
pub fn paths_equal(a: &Path, b: &Path) -> bool {
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => clean_path(a) == clean_path(b),
    }
}
