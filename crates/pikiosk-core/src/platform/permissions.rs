//! File permission handling.
//!
//! Menu entries are installed world-readable (0644); autostart entries must
//! carry the executable bit (0755) to be trusted by the session.

use crate::error::{KioskError, Result};
use std::path::Path;
use tracing::debug;

/// Set an explicit mode on a file.
///
/// No-op on platforms without Unix permission bits.
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path).map_err(|e| KioskError::io_with_path(e, path))?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(mode);
        std::fs::set_permissions(path, permissions)
            .map_err(|e| KioskError::io_with_path(e, path))?;
        debug!("Set mode {:o} on: {}", mode, path.display());
    }

    #[cfg(not(unix))]
    {
        let _ = mode;
        debug!("Skipping mode change for: {}", path.display());
    }

    Ok(())
}

/// Make a file executable (mode 0755).
pub fn set_executable(path: &Path) -> Result<()> {
    set_mode(path, 0o755)
}

/// Check if any execute bit is set on a file.
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_set_executable() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("entry.desktop");
        File::create(&file_path).unwrap();

        set_executable(&file_path).unwrap();

        #[cfg(unix)]
        assert!(is_executable(&file_path));
    }

    #[cfg(unix)]
    #[test]
    fn test_set_mode_readable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("entry.desktop");
        File::create(&file_path).unwrap();

        set_mode(&file_path, 0o644).unwrap();

        let mode = std::fs::metadata(&file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        assert!(!is_executable(&file_path));
    }

    #[test]
    fn test_set_mode_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = set_mode(&temp_dir.path().join("nope"), 0o644);

        #[cfg(unix)]
        assert!(matches!(result, Err(KioskError::Io { .. })));
        #[cfg(not(unix))]
        let _ = result;
    }
}
