//! Deployment orchestration.
//!
//! A run walks `CheckingPrereqs -> Enumerating -> Installing(i/N) ->
//! ResolvingPlaceholders -> RegisteringAutostart -> Refreshing -> Done`.
//! Only the prerequisite gate (and an unreadable source directory) stops a
//! run early; per-file failures are recorded and the remaining files are
//! still processed. Nothing is rolled back and nothing is retried: every step
//! is idempotent, so the whole run is simply safe to invoke again.

mod report;

pub use report::{DeployReport, DeployState, RunOutcome, StepFailure};

use crate::config::{DeployConfig, DesktopConfig, ProcessConfig};
use crate::desktop::{resolve_placeholder, substitute};
use crate::error::{KioskError, Result};
use crate::install::{
    self, deploy_assets, enumerate_descriptors, install_file_with, prereq::check_any_with_timeout,
    register_autostart, refresh_with, DescriptorFile,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Remediation printed when the browser is missing.
const BOOTSTRAP_HINT: &str =
    "run `pikiosk bootstrap` (the setup step) first to install the browser and CEC tools";

/// Drives one deployment over a [`DeployConfig`].
pub struct Deployer {
    config: DeployConfig,
    refresh_tool: String,
    refresh_timeout: Duration,
    version_timeout: Duration,
}

impl Deployer {
    /// Create a deployer; rejects invalid layouts up front.
    pub fn new(config: DeployConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            refresh_tool: ProcessConfig::REFRESH_TOOL.to_string(),
            refresh_timeout: ProcessConfig::REFRESH_TIMEOUT,
            version_timeout: ProcessConfig::VERSION_QUERY_TIMEOUT,
        })
    }

    /// Use a different desktop database refresh tool.
    pub fn with_refresh_tool(mut self, tool: impl Into<String>) -> Self {
        self.refresh_tool = tool.into();
        self
    }

    /// Override the external-process timeouts.
    pub fn with_timeouts(mut self, version_query: Duration, refresh: Duration) -> Self {
        self.version_timeout = version_query;
        self.refresh_timeout = refresh;
        self
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Execute the full run and report what happened.
    pub fn run(&self) -> DeployReport {
        let mut run = Run::new();

        // CheckingPrereqs
        run.enter(DeployState::CheckingPrereqs);
        match check_any_with_timeout(&self.config.prerequisites, self.version_timeout) {
            Ok(status) => run.report.prerequisite = Some(status),
            Err(e) => {
                error!("{}", e);
                run.fail("checking_prereqs", None, &e);
                run.report.hints.push(BOOTSTRAP_HINT.to_string());
                return run.abort(RunOutcome::PrerequisiteMissing, e.to_string());
            }
        }

        // Enumerating
        run.enter(DeployState::Enumerating);
        let descriptors = match enumerate_descriptors(
            &self.config.source_descriptor_dir,
            DesktopConfig::DESCRIPTOR_EXTENSION,
        ) {
            Ok(descriptors) => descriptors,
            Err(e) => {
                error!("{}", e);
                run.fail("enumerating", Some(&self.config.source_descriptor_dir), &e);
                run.report
                    .hints
                    .push("check that --repo points at the kiosk repository checkout".to_string());
                return run.abort(RunOutcome::Aborted, e.to_string());
            }
        };
        run.report.descriptors_found = descriptors.len();
        if descriptors.is_empty() {
            run.warn(format!(
                "no .{} files in {}",
                DesktopConfig::DESCRIPTOR_EXTENSION,
                self.config.source_descriptor_dir.display()
            ));
        } else {
            info!("Found {} descriptor(s)", descriptors.len());
        }

        // Installing: launcher bundle first (index 0) so the resolved path exists
        run.enter(DeployState::Installing {
            index: 0,
            total: descriptors.len(),
        });
        self.install_assets(&mut run);
        let installed = self.install_descriptors(&mut run, &descriptors);

        // ResolvingPlaceholders
        run.enter(DeployState::ResolvingPlaceholders);
        let resolved = self.resolve_placeholders(&mut run, &installed);

        // RegisteringAutostart
        run.enter(DeployState::RegisteringAutostart);
        self.register_autostart_entries(&mut run, &descriptors, &resolved);

        // Refreshing
        run.enter(DeployState::Refreshing);
        let refresh = refresh_with(&self.refresh_tool, &self.config.menu_dir, self.refresh_timeout);
        if let install::RefreshOutcome::Failed(ref msg) = refresh {
            run.warn(format!("desktop database refresh failed: {}", msg));
        }
        run.report.refresh = Some(refresh);

        run.finish()
    }

    fn install_assets(&self, run: &mut Run) {
        let deployment = deploy_assets(&self.config.source_asset_dir, &self.config.asset_data_dir);
        if deployment.source_missing {
            run.warn(format!(
                "launcher bundle missing at {}; {} will not exist",
                self.config.source_asset_dir.display(),
                self.config.entry_page_path().display()
            ));
        } else {
            info!(
                "Deployed {} launcher asset(s) to {}",
                deployment.installed.len(),
                self.config.asset_data_dir.display()
            );
        }
        for (path, err) in &deployment.failures {
            error!("Asset {}: {}", path.display(), err);
            run.fail("installing", Some(path), err);
        }
        run.report.assets = deployment.installed;
    }

    /// Returns the installed paths, in source order.
    fn install_descriptors(&self, run: &mut Run, descriptors: &[DescriptorFile]) -> Vec<PathBuf> {
        let total = descriptors.len();
        let mut installed = Vec::with_capacity(total);
        let token = self.config.placeholder_token.as_str();
        let value = self.config.entry_page_path();
        let value = value.to_string_lossy();
        // an installed copy that already holds the resolved text is current
        let is_settled = |existing: &[u8], source: &[u8]| match std::str::from_utf8(source) {
            Ok(text) if text.contains(token) => substitute(text, token, &value).as_bytes() == existing,
            _ => false,
        };

        for (i, descriptor) in descriptors.iter().enumerate() {
            run.enter(DeployState::Installing {
                index: i + 1,
                total,
            });
            match install_file_with(
                &descriptor.source_path,
                &self.config.menu_dir,
                DesktopConfig::MENU_FILE_MODE,
                is_settled,
            ) {
                Ok(outcome) => {
                    info!(
                        "[{}/{}] Installed {}{}",
                        i + 1,
                        total,
                        descriptor.file_name,
                        if outcome.unchanged { " (unchanged)" } else { "" }
                    );
                    installed.push(outcome.destination.clone());
                    run.report.installed.push(outcome);
                }
                Err(e) => {
                    error!("[{}/{}] {}: {}", i + 1, total, descriptor.file_name, e);
                    run.fail("installing", Some(&descriptor.source_path), &e);
                }
            }
        }

        installed
    }

    /// Returns the installed paths that are free of the token.
    fn resolve_placeholders(&self, run: &mut Run, installed: &[PathBuf]) -> HashSet<PathBuf> {
        let value = self.config.entry_page_path();
        let value = value.to_string_lossy();
        let mut clean = HashSet::new();

        for path in installed {
            match resolve_placeholder(path, &self.config.placeholder_token, &value) {
                Ok(resolution) => {
                    if resolution.replaced > 0 {
                        info!(
                            "Resolved {} placeholder(s) in {}",
                            resolution.replaced,
                            path.display()
                        );
                        run.report.placeholders_resolved.push(path.clone());
                    }
                    clean.insert(path.clone());
                }
                Err(e) => {
                    error!("{}", e);
                    run.fail("resolving_placeholders", Some(path), &e);
                }
            }
        }

        clean
    }

    fn register_autostart_entries(
        &self,
        run: &mut Run,
        descriptors: &[DescriptorFile],
        resolved: &HashSet<PathBuf>,
    ) {
        for name in &self.config.autostart_entries {
            let Some(descriptor) = descriptors.iter().find(|d| &d.file_name == name) else {
                let source = self.config.source_descriptor_dir.join(name);
                if self.config.autostart_explicit {
                    let err = KioskError::SourceMissing(source.clone());
                    error!("Autostart entry {}: {}", name, err);
                    run.fail("registering_autostart", Some(&source), &err);
                } else {
                    run.warn(format!(
                        "default autostart entry {} not found in {}; nothing registered",
                        name,
                        self.config.source_descriptor_dir.display()
                    ));
                }
                continue;
            };

            let installed = descriptor.installed_path(&self.config.menu_dir);
            if !resolved.contains(&installed) {
                // install or placeholder step already recorded the failure
                warn!("Skipping autostart for {}: not installed cleanly", name);
                continue;
            }

            match register_autostart(&installed, &self.config.autostart_dir) {
                Ok(registration) => run.report.autostart.push(registration),
                Err(e) => {
                    error!("Autostart entry {}: {}", name, e);
                    run.fail("registering_autostart", Some(&installed), &e);
                }
            }
        }
    }
}

/// Mutable state of one run.
struct Run {
    report: DeployReport,
}

impl Run {
    fn new() -> Self {
        Self {
            report: DeployReport::new(),
        }
    }

    fn enter(&mut self, state: DeployState) {
        tracing::debug!("-> {:?}", state);
        self.report.states.push(state);
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.report.warnings.push(message);
    }

    fn fail(&mut self, step: &'static str, path: Option<&Path>, err: &KioskError) {
        self.report.failures.push(StepFailure::new(step, path, err));
    }

    fn abort(mut self, outcome: RunOutcome, reason: String) -> DeployReport {
        self.enter(DeployState::Failed { reason });
        self.report.outcome = outcome;
        self.report
    }

    fn finish(mut self) -> DeployReport {
        self.enter(DeployState::Done);
        self.report.outcome = if self.report.failures.is_empty() {
            RunOutcome::Success
        } else {
            RunOutcome::CompletedWithFailures
        };
        self.report
    }
}
