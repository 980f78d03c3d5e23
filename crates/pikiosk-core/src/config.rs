//! Centralized configuration for pikiosk.
//!
//! Constants live in unit structs; the per-run directory layout lives in
//! [`DeployConfig`], which is built once at startup and handed to the engine.

use crate::error::{KioskError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "pikiosk";
    /// Directory name of the deployed launcher bundle under the XDG data dir.
    pub const LAUNCHER_APP_DIR_NAME: &'static str = "tv-launcher";
}

/// Descriptor format constants.
pub struct DesktopConfig;

impl DesktopConfig {
    pub const DESCRIPTOR_EXTENSION: &'static str = "desktop";
    pub const PLACEHOLDER_TOKEN: &'static str = "__LAUNCHER_INDEX_HTML__";
    pub const EXEC_KEY: &'static str = "Exec";
    pub const NAME_KEY: &'static str = "Name";
    pub const GROUP_HEADER: &'static str = "[Desktop Entry]";
    pub const DEFAULT_AUTOSTART_ENTRY: &'static str = "tv-launcher.desktop";
    pub const ENTRY_PAGE_NAME: &'static str = "index.html";
    pub const BACKUP_SUFFIX: &'static str = "bak";
    pub const BACKUP_TIMESTAMP_FORMAT: &'static str = "%Y%m%d_%H%M%S";
    pub const MENU_FILE_MODE: u32 = 0o644;
    pub const AUTOSTART_FILE_MODE: u32 = 0o755;
    /// Backups are plain data, never executable.
    pub const BACKUP_FILE_MODE: u32 = 0o644;
}

/// External process timeouts.
pub struct ProcessConfig;

impl ProcessConfig {
    pub const VERSION_QUERY_TIMEOUT: Duration = Duration::from_secs(5);
    pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(10);
    pub const PACKAGE_QUERY_TIMEOUT: Duration = Duration::from_secs(15);
    pub const PACKAGE_INSTALL_TIMEOUT: Duration = Duration::from_secs(900);
    pub const CEC_SCAN_TIMEOUT: Duration = Duration::from_secs(20);
    pub const NETWORK_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
    pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
    pub const REFRESH_TOOL: &'static str = "update-desktop-database";
}

/// Source and destination directory names.
pub struct PathsConfig;

impl PathsConfig {
    pub const SOURCE_FILES_DIR_NAME: &'static str = "files";
    pub const SOURCE_DESKTOP_DIR_NAME: &'static str = "desktop";
    pub const SOURCE_LAUNCHER_DIR_NAME: &'static str = "launcher";
}

/// Browser defaults for the kiosk launch.
pub struct BrowserConfig;

impl BrowserConfig {
    pub const CANDIDATES: [&'static str; 2] = ["chromium-browser", "chromium"];
    /// Device string that makes streaming sites serve their TV layout.
    pub const TV_USER_AGENT: &'static str = "Mozilla/5.0 (SMART-TV; Linux; Tizen 6.0) \
        AppleWebKit/537.36 (KHTML, like Gecko) SamsungBrowser/4.0 Chrome/76.0.3809.146 TV Safari/537.36";
    pub const KIOSK_FLAGS: [&'static str; 5] = [
        "--kiosk",
        "--noerrdialogs",
        "--disable-infobars",
        "--check-for-update-interval=31536000",
        "--autoplay-policy=no-user-gesture-required",
    ];
}

/// Package bootstrap defaults.
pub struct BootstrapConfig;

impl BootstrapConfig {
    pub const PACKAGES: [&'static str; 3] = ["chromium-browser", "cec-utils", "unclutter"];
    pub const INSTALLED_STATUS: &'static str = "install ok installed";
}

/// Directory layout and selection for one deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// `<repo>/files/desktop`
    pub source_descriptor_dir: PathBuf,
    /// `<repo>/files/launcher`
    pub source_asset_dir: PathBuf,
    /// `~/.local/share/applications`
    pub menu_dir: PathBuf,
    /// `~/.config/autostart`
    pub autostart_dir: PathBuf,
    /// `~/.local/share/tv-launcher`
    pub asset_data_dir: PathBuf,
    /// Binary names; the first one found on PATH satisfies the gate.
    pub prerequisites: Vec<String>,
    /// Descriptor file names that are also registered for autostart.
    pub autostart_entries: Vec<String>,
    /// `autostart_entries` was chosen by the caller rather than defaulted.
    /// Only an explicit selection that names no source descriptor is a failure.
    #[serde(default)]
    pub autostart_explicit: bool,
    pub placeholder_token: String,
    /// File name of the entry page inside `asset_data_dir`.
    pub entry_page: String,
}

impl DeployConfig {
    /// Build the layout for `repo_root` using the current user's home directory.
    pub fn from_environment(repo_root: impl AsRef<Path>) -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| KioskError::Config {
            message: "Could not determine home directory".to_string(),
        })?;
        Ok(Self::for_home(repo_root, home))
    }

    /// Build the layout for `repo_root` rooted at an explicit home directory.
    pub fn for_home(repo_root: impl AsRef<Path>, home: impl AsRef<Path>) -> Self {
        let files = repo_root.as_ref().join(PathsConfig::SOURCE_FILES_DIR_NAME);
        let home = home.as_ref();

        Self {
            source_descriptor_dir: files.join(PathsConfig::SOURCE_DESKTOP_DIR_NAME),
            source_asset_dir: files.join(PathsConfig::SOURCE_LAUNCHER_DIR_NAME),
            menu_dir: crate::platform::paths::apps_dir_in(home),
            autostart_dir: crate::platform::paths::autostart_dir_in(home),
            asset_data_dir: crate::platform::paths::data_dir_in(home)
                .join(AppConfig::LAUNCHER_APP_DIR_NAME),
            prerequisites: BrowserConfig::CANDIDATES.iter().map(|s| s.to_string()).collect(),
            autostart_entries: vec![DesktopConfig::DEFAULT_AUTOSTART_ENTRY.to_string()],
            autostart_explicit: false,
            placeholder_token: DesktopConfig::PLACEHOLDER_TOKEN.to_string(),
            entry_page: DesktopConfig::ENTRY_PAGE_NAME.to_string(),
        }
    }

    /// Replace the prerequisite candidates.
    pub fn with_prerequisites(mut self, prerequisites: Vec<String>) -> Self {
        self.prerequisites = prerequisites;
        self
    }

    /// Replace the autostart selection; the names become required.
    pub fn with_autostart_entries(mut self, entries: Vec<String>) -> Self {
        self.autostart_entries = entries;
        self.autostart_explicit = true;
        self
    }

    /// Absolute path of the deployed entry page; the placeholder resolves to this.
    pub fn entry_page_path(&self) -> PathBuf {
        self.asset_data_dir.join(&self.entry_page)
    }

    /// Reject layouts the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.placeholder_token.is_empty() {
            return Err(KioskError::Validation {
                field: "placeholder_token".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.prerequisites.is_empty() {
            return Err(KioskError::Validation {
                field: "prerequisites".to_string(),
                message: "at least one candidate binary is required".to_string(),
            });
        }
        for (field, path) in [
            ("menu_dir", &self.menu_dir),
            ("autostart_dir", &self.autostart_dir),
            ("asset_data_dir", &self.asset_data_dir),
        ] {
            if !path.is_absolute() {
                return Err(KioskError::Validation {
                    field: field.to_string(),
                    message: format!("must be absolute, got {}", path.display()),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_for_home() {
        let config = DeployConfig::for_home("/srv/repo", "/home/pi");

        assert_eq!(
            config.source_descriptor_dir,
            PathBuf::from("/srv/repo/files/desktop")
        );
        assert_eq!(
            config.source_asset_dir,
            PathBuf::from("/srv/repo/files/launcher")
        );
        assert_eq!(
            config.menu_dir,
            PathBuf::from("/home/pi/.local/share/applications")
        );
        assert_eq!(config.autostart_dir, PathBuf::from("/home/pi/.config/autostart"));
        assert_eq!(
            config.entry_page_path(),
            PathBuf::from("/home/pi/.local/share/tv-launcher/index.html")
        );
        assert!(config.validate().is_ok());
        assert!(!config.autostart_explicit);
        assert!(
            config
                .with_autostart_entries(vec!["tv-launcher.desktop".into()])
                .autostart_explicit
        );
    }

    #[test]
    fn test_validate_rejects_empty_token() {
        let mut config = DeployConfig::for_home("/srv/repo", "/home/pi");
        config.placeholder_token.clear();
        assert!(matches!(
            config.validate(),
            Err(KioskError::Validation { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_relative_dirs() {
        let config = DeployConfig::for_home("repo", "home");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serializes() {
        let config = DeployConfig::for_home("/srv/repo", "/home/pi")
            .with_autostart_entries(vec!["a.desktop".into()]);
        let json = serde_json::to_string(&config).unwrap();
        let back: DeployConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.autostart_entries, vec!["a.desktop".to_string()]);
    }
}
