//! Best-effort desktop database refresh.
//!
//! Menu changes take effect on next login even without the refresh, so an
//! absent, hanging or failing tool is never counted as a failure.

use crate::error::KioskError;
use crate::platform::{self, process::run_with_timeout};
use serde::Serialize;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of a refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Refreshed,
    /// Tool not on PATH, or it hung past the timeout.
    ToolAbsent(String),
    /// Tool ran and reported an error.
    Failed(String),
}

/// Run `tool <target_dir>` with a timeout.
pub fn refresh_with(tool: &str, target_dir: &Path, timeout: Duration) -> RefreshOutcome {
    let Some(path) = platform::find_program(tool) else {
        info!("{} not installed; menu will update on next login", tool);
        return RefreshOutcome::ToolAbsent(tool.to_string());
    };

    let mut command = Command::new(path);
    command.arg(target_dir);

    match run_with_timeout(command, None, timeout) {
        Ok(output) if output.success() => {
            info!("Refreshed desktop database in {}", target_dir.display());
            RefreshOutcome::Refreshed
        }
        Ok(output) => {
            let detail = output
                .first_line()
                .unwrap_or_else(|| format!("exited with {}", output.status));
            warn!("{} reported: {}", tool, detail);
            RefreshOutcome::Failed(detail)
        }
        Err(KioskError::Timeout { .. }) | Err(KioskError::ToolAbsent { .. }) => {
            info!("{} unavailable; menu will update on next login", tool);
            RefreshOutcome::ToolAbsent(tool.to_string())
        }
        Err(e) => {
            warn!("{} could not run: {}", tool, e);
            RefreshOutcome::Failed(e.to_string())
        }
    }
}
