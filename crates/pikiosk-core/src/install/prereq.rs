//! Prerequisite (browser binary) detection.
//!
//! Only reports; never installs. A binary that hangs on `--version` is
//! treated as absent so the gate can never stall a run.

use crate::error::{KioskError, Result};
use crate::platform::{self, process::run_with_timeout};
use serde::Serialize;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Presence and version of an external dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrerequisiteStatus {
    pub name: String,
    pub present: bool,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
}

impl PrerequisiteStatus {
    fn absent(name: &str) -> Self {
        Self {
            name: name.to_string(),
            present: false,
            path: None,
            version: None,
        }
    }
}

/// Look `binary` up on PATH and query its version, giving up after `timeout`.
pub fn check_prerequisite_with_timeout(binary: &str, timeout: Duration) -> PrerequisiteStatus {
    let Some(path) = platform::find_program(binary) else {
        debug!("{} not found on PATH", binary);
        return PrerequisiteStatus::absent(binary);
    };

    let mut command = Command::new(&path);
    command.arg("--version");

    match run_with_timeout(command, None, timeout) {
        Ok(output) => PrerequisiteStatus {
            name: binary.to_string(),
            present: true,
            path: Some(path),
            version: output.first_line(),
        },
        Err(KioskError::Timeout { .. }) => {
            warn!("{} did not answer --version within {:?}", binary, timeout);
            PrerequisiteStatus::absent(binary)
        }
        Err(e) => {
            warn!("{} found at {} but could not run: {}", binary, path.display(), e);
            PrerequisiteStatus::absent(binary)
        }
    }
}

/// First present binary among `candidates`, or `PrerequisiteMissing`.
pub fn check_any_with_timeout(candidates: &[String], timeout: Duration) -> Result<PrerequisiteStatus> {
    for candidate in candidates {
        let status = check_prerequisite_with_timeout(candidate, timeout);
        if status.present {
            info!(
                "Found {} ({})",
                candidate,
                status.version.as_deref().unwrap_or("unknown version")
            );
            return Ok(status);
        }
    }

    Err(KioskError::PrerequisiteMissing {
        candidates: candidates.to_vec(),
    })
}
