//! Autostart registration.
//!
//! An autostart entry is a copy of an already-installed (placeholder-resolved)
//! menu entry, placed in the autostart directory and marked executable.

use crate::config::DesktopConfig;
use crate::desktop::entry::require_launchable;
use crate::error::{KioskError, Result};
use crate::install::writer::install_file_with_mode;
use crate::platform;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Result of registering one entry for autostart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutostartRegistration {
    pub destination: PathBuf,
    pub backup: Option<PathBuf>,
    /// The execution directive found in the registered copy.
    pub exec: String,
}

/// Copy `installed` into `autostart_dir` and mark it executable.
///
/// The entry is checked on `installed` before anything is written, and again
/// on the copy afterwards. An entry without an execution directive fails with
/// `MissingExecDirective`; one without a `Name` fails validation. The session
/// would silently ignore either.
pub fn register_autostart(installed: &Path, autostart_dir: &Path) -> Result<AutostartRegistration> {
    if !installed.is_file() {
        return Err(KioskError::SourceMissing(installed.to_path_buf()));
    }
    require_launchable(installed)?;

    let outcome = install_file_with_mode(installed, autostart_dir, DesktopConfig::AUTOSTART_FILE_MODE)?;
    platform::set_executable(&outcome.destination)?;

    let exec = require_launchable(&outcome.destination)?;
    info!("Registered autostart entry {}", outcome.destination.display());

    Ok(AutostartRegistration {
        destination: outcome.destination,
        backup: outcome.backup,
        exec,
    })
}
