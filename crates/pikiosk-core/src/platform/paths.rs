//! XDG path utilities.
//!
//! Every directory is derived from an explicit home directory so callers (and
//! tests) never depend on the ambient `$HOME`.

use std::path::{Path, PathBuf};

/// Menu entries directory below `home`.
pub fn apps_dir_in(home: &Path) -> PathBuf {
    data_dir_in(home).join("applications")
}

/// Autostart directory below `home`.
pub fn autostart_dir_in(home: &Path) -> PathBuf {
    home.join(".config").join("autostart")
}

/// User data directory below `home`.
pub fn data_dir_in(home: &Path) -> PathBuf {
    home.join(".local").join("share")
}

/// Resolve a program through the command search path.
///
/// Names containing a path separator are checked directly.
pub fn find_program(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dirs_in_home() {
        let home = PathBuf::from("/home/pi");
        assert_eq!(
            apps_dir_in(&home),
            PathBuf::from("/home/pi/.local/share/applications")
        );
        assert_eq!(
            autostart_dir_in(&home),
            PathBuf::from("/home/pi/.config/autostart")
        );
    }

    #[test]
    fn test_find_program_missing() {
        assert!(find_program("pikiosk-definitely-not-a-real-binary").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_program_by_path() {
        let temp_dir = TempDir::new().unwrap();
        let tool = temp_dir.path().join("tool");
        std::fs::write(&tool, "#!/bin/sh\nexit 0\n").unwrap();
        crate::platform::set_executable(&tool).unwrap();

        assert!(find_program(tool.to_str().unwrap()).is_some());
    }
}
