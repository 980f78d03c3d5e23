//! Deployment of the static launcher bundle.

use crate::config::DesktopConfig;
use crate::error::KioskError;
use crate::install::writer::{install_to, InstallOutcome};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What happened while copying the bundle.
#[derive(Debug, Default)]
pub struct AssetDeployment {
    pub installed: Vec<InstallOutcome>,
    pub failures: Vec<(PathBuf, KioskError)>,
    /// The source bundle directory did not exist.
    pub source_missing: bool,
}

/// Copy every file below `source_dir` into `data_dir`, keeping relative paths.
///
/// Each file goes through the backup-aware writer. Failures are collected per
/// file; the remaining files are still copied.
pub fn deploy_assets(source_dir: &Path, data_dir: &Path) -> AssetDeployment {
    let mut deployment = AssetDeployment::default();

    if !source_dir.is_dir() {
        warn!("Launcher bundle not found at {}", source_dir.display());
        deployment.source_missing = true;
        return deployment;
    }

    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(source_dir).to_path_buf();
                deployment.failures.push((
                    path.clone(),
                    KioskError::Io {
                        message: e.to_string(),
                        path: Some(path),
                        source: e.into_io_error(),
                    },
                ));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let source = entry.path();
        let relative = match source.strip_prefix(source_dir) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let destination = data_dir.join(relative);

        match install_to(source, &destination, DesktopConfig::MENU_FILE_MODE) {
            Ok(outcome) => {
                debug!("Deployed asset {}", outcome.destination.display());
                deployment.installed.push(outcome);
            }
            Err(e) => deployment.failures.push((source.to_path_buf(), e)),
        }
    }

    deployment
}
