//! Desktop entry (.desktop file) parsing.
//!
//! Only the keys the deploy engine checks are surfaced as fields; everything
//! else in the file is left untouched and is never rewritten.

use crate::config::DesktopConfig;
use crate::error::{KioskError, Result};
use std::fs;
use std::path::Path;

/// The parts of a desktop entry the engine inspects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesktopEntry {
    /// Entry name (shown in menus).
    pub name: Option<String>,
    /// Executable command.
    pub exec: Option<String>,
    /// Comment/description.
    pub comment: Option<String>,
    /// Icon name or path.
    pub icon: Option<String>,
    /// Entry type (usually "Application").
    pub entry_type: Option<String>,
    /// Whether to run in a terminal.
    pub terminal: bool,
    /// Whether this is a hidden entry.
    pub hidden: bool,
    /// Whether this entry should not be displayed.
    pub no_display: bool,
}

impl DesktopEntry {
    /// Parse descriptor text.
    ///
    /// Keys are read from the `[Desktop Entry]` group, or from the top of the
    /// file when no group header precedes them. Localized keys (`Name[de]`)
    /// and other groups (`[Desktop Action ...]`) are ignored.
    pub fn parse(content: &str) -> Self {
        let mut entry = DesktopEntry::default();
        let mut in_main_group = true;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') {
                in_main_group = line == DesktopConfig::GROUP_HEADER;
                continue;
            }
            if !in_main_group {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();

            match key.trim() {
                DesktopConfig::NAME_KEY => entry.name = Some(value),
                DesktopConfig::EXEC_KEY => entry.exec = Some(value),
                "Comment" => entry.comment = Some(value),
                "Icon" => entry.icon = Some(value),
                "Type" => entry.entry_type = Some(value),
                "Terminal" => entry.terminal = value == "true",
                "Hidden" => entry.hidden = value == "true",
                "NoDisplay" => entry.no_display = value == "true",
                _ => {}
            }
        }

        entry
    }

    /// Read and parse a descriptor file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| KioskError::io_with_path(e, path))?;
        Ok(Self::parse(&content))
    }

    /// The non-empty execution directive, if present.
    pub fn exec_directive(&self) -> Option<&str> {
        self.exec.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    /// Whether the entry has both a name and a usable execution directive.
    pub fn is_launchable(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty()) && self.exec_directive().is_some()
    }
}

/// Check that the file at `path` is launchable: a non-empty `Exec` directive
/// and a non-empty `Name`. Returns the directive.
pub fn require_launchable(path: &Path) -> Result<String> {
    let entry = DesktopEntry::from_file(path)?;
    let exec = entry
        .exec_directive()
        .map(str::to_string)
        .ok_or_else(|| KioskError::MissingExecDirective(path.to_path_buf()))?;
    if !entry.is_launchable() {
        return Err(KioskError::Validation {
            field: DesktopConfig::NAME_KEY.to_string(),
            message: format!("{} has no {} key", path.display(), DesktopConfig::NAME_KEY),
        });
    }
    Ok(exec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LAUNCHER: &str = "[Desktop Entry]
Type=Application
Name=TV Launcher
Name[de]=TV Starter
Comment=Tile launcher
Exec=chromium-browser --kiosk file://__LAUNCHER_INDEX_HTML__
Icon=tv
Terminal=false

[Desktop Action Quit]
Name=Quit
Exec=pkill chromium
";

    #[test]
    fn test_parse_main_group() {
        let entry = DesktopEntry::parse(LAUNCHER);

        assert_eq!(entry.name.as_deref(), Some("TV Launcher"));
        assert_eq!(entry.entry_type.as_deref(), Some("Application"));
        assert_eq!(entry.icon.as_deref(), Some("tv"));
        assert!(!entry.terminal);
        assert_eq!(
            entry.exec_directive(),
            Some("chromium-browser --kiosk file://__LAUNCHER_INDEX_HTML__")
        );
        assert!(entry.is_launchable());
    }

    #[test]
    fn test_parse_without_header() {
        let entry = DesktopEntry::parse("Name=Bare\nExec=/bin/true\n");
        assert!(entry.is_launchable());
    }

    #[test]
    fn test_empty_exec_is_not_a_directive() {
        let entry = DesktopEntry::parse("[Desktop Entry]\nName=Broken\nExec=   \n");
        assert_eq!(entry.exec_directive(), None);
        assert!(!entry.is_launchable());
    }

    #[test]
    fn test_exec_only_in_action_group_does_not_count() {
        let entry =
            DesktopEntry::parse("[Desktop Entry]\nName=X\n[Desktop Action A]\nExec=/bin/true\n");
        assert_eq!(entry.exec_directive(), None);
    }

    #[test]
    fn test_require_launchable() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.desktop");
        let bad = temp_dir.path().join("bad.desktop");
        fs::write(&good, LAUNCHER).unwrap();
        fs::write(&bad, "[Desktop Entry]\nName=No exec\n").unwrap();

        assert!(require_launchable(&good).unwrap().starts_with("chromium-browser"));
        assert!(matches!(
            require_launchable(&bad),
            Err(KioskError::MissingExecDirective(_))
        ));
    }

    #[test]
    fn test_require_launchable_needs_name() {
        let temp_dir = TempDir::new().unwrap();
        let nameless = temp_dir.path().join("nameless.desktop");
        let noexec = temp_dir.path().join("noexec.desktop");
        fs::write(&nameless, "[Desktop Entry]\nExec=/bin/true\n").unwrap();
        fs::write(&noexec, "[Desktop Entry]\nName=X\n").unwrap();

        assert!(matches!(
            require_launchable(&nameless),
            Err(KioskError::Validation { ref field, .. }) if field == "Name"
        ));
        assert!(matches!(
            require_launchable(&noexec),
            Err(KioskError::MissingExecDirective(_))
        ));
    }
}
