//! Path normalization utilities.
//!
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `file_stem` - file name without extension, as an owned string
//! - `same_file_name` - compare the final component of two paths

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
///
/// Deleted files cannot be canonicalized, so the fallback matters for
/// remove events.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// File name without its extension. `None` for paths like `/` or `..`.
#[inline]
pub fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// True if `path` has extension `ext` (case-insensitive, no leading dot).
#[inline]
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Compare only the final path component.
#[inline]
pub fn same_file_name(a: &Path, b: &Path) -> bool {
    matches!((a.file_name(), b.file_name()), (Some(x), Some(y)) if x == y)
}
