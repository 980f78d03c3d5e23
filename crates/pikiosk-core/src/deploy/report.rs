//! Run report for a deployment.

use crate::error::KioskError;
use crate::install::{AutostartRegistration, InstallOutcome, PrerequisiteStatus, RefreshOutcome};
use serde::Serialize;
use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};

/// Phases of a deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeployState {
    CheckingPrereqs,
    Enumerating,
    Installing { index: usize, total: usize },
    ResolvingPlaceholders,
    RegisteringAutostart,
    Refreshing,
    Done,
    Failed { reason: String },
}

impl DeployState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeployState::Done | DeployState::Failed { .. })
    }
}

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    CompletedWithFailures,
    PrerequisiteMissing,
    Aborted,
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    /// Phase name the failure happened in.
    pub step: &'static str,
    pub path: Option<PathBuf>,
    /// Error kind, see [`KioskError::kind`].
    pub kind: &'static str,
    pub message: String,
}

impl StepFailure {
    pub fn new(step: &'static str, path: Option<&Path>, err: &KioskError) -> Self {
        Self {
            step,
            path: path.map(Path::to_path_buf),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Everything a run did, in order.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub outcome: RunOutcome,
    /// Every state the run entered, ending in `Done` or `Failed`.
    pub states: Vec<DeployState>,
    pub prerequisite: Option<PrerequisiteStatus>,
    pub descriptors_found: usize,
    pub installed: Vec<InstallOutcome>,
    pub assets: Vec<InstallOutcome>,
    pub placeholders_resolved: Vec<PathBuf>,
    pub autostart: Vec<AutostartRegistration>,
    pub refresh: Option<RefreshOutcome>,
    pub warnings: Vec<String>,
    pub failures: Vec<StepFailure>,
    pub hints: Vec<String>,
}

impl DeployReport {
    pub(crate) fn new() -> Self {
        Self {
            outcome: RunOutcome::Success,
            states: Vec::new(),
            prerequisite: None,
            descriptors_found: 0,
            installed: Vec::new(),
            assets: Vec::new(),
            placeholders_resolved: Vec::new(),
            autostart: Vec::new(),
            refresh: None,
            warnings: Vec::new(),
            failures: Vec::new(),
            hints: Vec::new(),
        }
    }

    /// The state the run finished in.
    pub fn final_state(&self) -> Option<&DeployState> {
        self.states.last()
    }

    /// Backups created during this run, in menu, asset and autostart order.
    pub fn backups(&self) -> Vec<&Path> {
        self.installed
            .iter()
            .chain(self.assets.iter())
            .filter_map(|o| o.backup.as_deref())
            .chain(self.autostart.iter().filter_map(|r| r.backup.as_deref()))
            .collect()
    }

    /// Number of failed steps; also the process exit code (clamped to 255).
    pub fn exit_code(&self) -> i32 {
        self.failures.len().min(255) as i32
    }

    /// Human-readable summary printed at the end of a run.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();

        writeln!(out, "Deployment summary").ok();
        if let Some(ref prereq) = self.prerequisite {
            writeln!(
                out,
                "  prerequisite: {} ({})",
                prereq.name,
                prereq.version.as_deref().unwrap_or("unknown version")
            )
            .ok();
        }
        writeln!(out, "  descriptors found:  {}", self.descriptors_found).ok();
        writeln!(out, "  menu entries:       {}", self.installed.len()).ok();
        writeln!(out, "  launcher assets:    {}", self.assets.len()).ok();
        writeln!(out, "  placeholders:       {}", self.placeholders_resolved.len()).ok();
        writeln!(out, "  autostart entries:  {}", self.autostart.len()).ok();
        writeln!(out, "  backups created:    {}", self.backups().len()).ok();
        match self.refresh {
            Some(RefreshOutcome::Refreshed) => writeln!(out, "  menu database:      refreshed").ok(),
            Some(RefreshOutcome::ToolAbsent(ref tool)) => {
                writeln!(out, "  menu database:      {} not available", tool).ok()
            }
            Some(RefreshOutcome::Failed(ref msg)) => {
                writeln!(out, "  menu database:      refresh failed ({})", msg).ok()
            }
            None => None,
        };

        for warning in &self.warnings {
            writeln!(out, "warning: {}", warning).ok();
        }
        for failure in &self.failures {
            match failure.path {
                Some(ref path) => writeln!(
                    out,
                    "error [{}] {}: {}",
                    failure.step,
                    path.display(),
                    failure.message
                )
                .ok(),
                None => writeln!(out, "error [{}] {}", failure.step, failure.message).ok(),
            };
        }
        for hint in &self.hints {
            writeln!(out, "hint: {}", hint).ok();
        }

        let status = match self.outcome {
            RunOutcome::Success => "OK".to_string(),
            RunOutcome::CompletedWithFailures => format!("{} step(s) failed", self.failures.len()),
            RunOutcome::PrerequisiteMissing => "prerequisite missing, nothing installed".to_string(),
            RunOutcome::Aborted => "aborted".to_string(),
        };
        writeln!(out, "result: {}", status).ok();

        out
    }
}
