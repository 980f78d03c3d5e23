//! Placeholder substitution in installed descriptors.
//!
//! [`substitute`] is a pure text transform; [`resolve_placeholder`] applies it
//! to a file in place and then re-reads the file to prove the token is gone.

use crate::config::DesktopConfig;
use crate::error::{KioskError, Result};
use crate::install::writer::write_atomically;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Outcome of resolving a token in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderResolution {
    /// Number of occurrences replaced.
    pub replaced: usize,
}

/// Replace every occurrence of `token` in `content` with `value`.
///
/// Plain substring replacement: `value` may contain `/`, `|`, `&` or any
/// other character without escaping.
pub fn substitute(content: &str, token: &str, value: &str) -> String {
    if token.is_empty() {
        return content.to_string();
    }
    content.replace(token, value)
}

/// Count non-overlapping occurrences of `token` in `content`.
pub fn count_occurrences(content: &str, token: &str) -> usize {
    if token.is_empty() {
        return 0;
    }
    content.matches(token).count()
}

/// Replace `token` with `value` in the file at `path`, in place.
///
/// The file is rewritten only when it contains the token. Afterwards the file
/// is scanned again; any remaining occurrence (for example when `value`
/// itself contains the token) is a `PlaceholderUnresolved` error.
pub fn resolve_placeholder(path: &Path, token: &str, value: &str) -> Result<PlaceholderResolution> {
    if token.is_empty() {
        return Err(KioskError::Validation {
            field: "token".to_string(),
            message: "placeholder token must not be empty".to_string(),
        });
    }

    let content = fs::read_to_string(path).map_err(|e| KioskError::io_with_path(e, path))?;
    let replaced = count_occurrences(&content, token);

    if replaced > 0 {
        let mode = current_mode(path).unwrap_or(DesktopConfig::MENU_FILE_MODE);
        write_atomically(path, substitute(&content, token, value).as_bytes(), mode)?;
        debug!("Replaced {} occurrence(s) of {} in {:?}", replaced, token, path);
    }

    let after = fs::read_to_string(path).map_err(|e| KioskError::io_with_path(e, path))?;
    let remaining = count_occurrences(&after, token);
    if remaining > 0 {
        return Err(KioskError::PlaceholderUnresolved {
            path: path.to_path_buf(),
            token: token.to_string(),
            remaining,
        });
    }

    Ok(PlaceholderResolution { replaced })
}

#[cfg(unix)]
fn current_mode(path: &Path) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).ok().map(|m| m.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn current_mode(_path: &Path) -> Option<u32> {
    None
}
