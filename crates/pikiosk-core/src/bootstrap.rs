//! Package bootstrap through the system package manager.
//!
//! Packages already reported as installed by `dpkg-query` are skipped, so the
//! bootstrap is safe to re-run. Package semantics stay with apt; this module
//! only invokes it and counts failures.

use crate::config::{BootstrapConfig, ProcessConfig};
use crate::error::KioskError;
use crate::platform::{self, process::run_with_timeout};
use serde::Serialize;
use std::process::Command;
use std::time::Duration;
use tracing::{error, info};

/// What happened to one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "detail", rename_all = "snake_case")]
pub enum PackageAction {
    AlreadyInstalled,
    Installed,
    WouldInstall,
    Failed(String),
}

/// Per-package result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageResult {
    pub name: String,
    pub action: PackageAction,
}

/// Result of a bootstrap run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BootstrapReport {
    pub packages: Vec<PackageResult>,
}

impl BootstrapReport {
    pub fn failed(&self) -> usize {
        self.packages
            .iter()
            .filter(|p| matches!(p.action, PackageAction::Failed(_)))
            .count()
    }

    /// Number of failed packages (clamped to 255).
    pub fn exit_code(&self) -> i32 {
        self.failed().min(255) as i32
    }
}

/// Installs missing packages.
pub struct Bootstrapper {
    packages: Vec<String>,
    use_sudo: bool,
    dry_run: bool,
    query_tool: String,
    install_tool: String,
    query_timeout: Duration,
    install_timeout: Duration,
}

impl Default for Bootstrapper {
    fn default() -> Self {
        Self {
            packages: BootstrapConfig::PACKAGES.iter().map(|s| s.to_string()).collect(),
            use_sudo: !platform::is_root(),
            dry_run: false,
            query_tool: "dpkg-query".to_string(),
            install_tool: "apt-get".to_string(),
            query_timeout: ProcessConfig::PACKAGE_QUERY_TIMEOUT,
            install_timeout: ProcessConfig::PACKAGE_INSTALL_TIMEOUT,
        }
    }
}

impl Bootstrapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the packages to ensure.
    pub fn packages(mut self, packages: Vec<String>) -> Self {
        self.packages = packages;
        self
    }

    /// Prefix installs with `sudo`.
    pub fn use_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    /// Only report what would be installed.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Override the query and install programs.
    pub fn tools(mut self, query_tool: impl Into<String>, install_tool: impl Into<String>) -> Self {
        self.query_tool = query_tool.into();
        self.install_tool = install_tool.into();
        self
    }

    /// Whether `package` is already installed.
    pub fn is_installed(&self, package: &str) -> crate::Result<bool> {
        let mut command = Command::new(&self.query_tool);
        command.args(["-W", "-f=${Status}", package]);

        let output = run_with_timeout(command, None, self.query_timeout)?;
        // unknown packages make dpkg-query exit non-zero
        Ok(output.success() && output.stdout.contains(BootstrapConfig::INSTALLED_STATUS))
    }

    fn install(&self, package: &str) -> crate::Result<()> {
        let mut command = if self.use_sudo {
            let mut c = Command::new("sudo");
            c.arg(&self.install_tool);
            c
        } else {
            Command::new(&self.install_tool)
        };
        command
            .args(["install", "-y", package])
            .env("DEBIAN_FRONTEND", "noninteractive");

        let description = platform::process::describe(&command);
        let output = run_with_timeout(command, None, self.install_timeout)?;
        if output.success() {
            Ok(())
        } else {
            Err(KioskError::CommandFailed {
                command: description,
                message: output
                    .stderr
                    .lines()
                    .rev()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("exited with {}", output.status)),
            })
        }
    }

    /// Ensure every package, continuing past failures.
    pub fn run(&self) -> BootstrapReport {
        let mut report = BootstrapReport::default();

        for package in &self.packages {
            let action = match self.is_installed(package) {
                Ok(true) => {
                    info!("{} already installed", package);
                    PackageAction::AlreadyInstalled
                }
                Ok(false) if self.dry_run => {
                    info!("{} would be installed", package);
                    PackageAction::WouldInstall
                }
                Ok(false) => match self.install(package) {
                    Ok(()) => {
                        info!("Installed {}", package);
                        PackageAction::Installed
                    }
                    Err(e) => {
                        error!("Failed to install {}: {}", package, e);
                        PackageAction::Failed(e.to_string())
                    }
                },
                Err(e) => {
                    error!("Could not query {}: {}", package, e);
                    PackageAction::Failed(e.to_string())
                }
            };

            report.packages.push(PackageResult {
                name: package.clone(),
                action,
            });
        }

        report
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn script(dir: &TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        platform::set_executable(&path).unwrap();
        path.to_string_lossy().into_owned()
    }

    /// Fake dpkg-query: only `cec-utils` is installed.
    fn fake_query(dir: &TempDir) -> String {
        script(
            dir,
            "dpkg-query",
            r#"case "$3" in
  cec-utils) printf 'install ok installed' ;;
  *) echo "dpkg-query: no packages found matching $3" >&2; exit 1 ;;
esac"#,
        )
    }

    #[test]
    fn test_skips_installed_and_installs_missing() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("apt.log");
        let query = fake_query(&temp_dir);
        let apt = script(
            &temp_dir,
            "apt-get",
            &format!("echo \"$@\" >> '{}'", log.display()),
        );

        let report = Bootstrapper::new()
            .packages(vec!["cec-utils".into(), "chromium-browser".into()])
            .use_sudo(false)
            .tools(query, apt)
            .run();

        assert_eq!(report.packages[0].action, PackageAction::AlreadyInstalled);
        assert_eq!(report.packages[1].action, PackageAction::Installed);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(
            fs::read_to_string(log).unwrap().trim(),
            "install -y chromium-browser"
        );
    }

    #[test]
    fn test_dry_run_installs_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let query = fake_query(&temp_dir);

        let report = Bootstrapper::new()
            .packages(vec!["unclutter".into()])
            .use_sudo(false)
            .dry_run(true)
            .tools(query, "pikiosk-no-such-apt")
            .run();

        assert_eq!(report.packages[0].action, PackageAction::WouldInstall);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_failures_are_counted() {
        let temp_dir = TempDir::new().unwrap();
        let query = fake_query(&temp_dir);
        let apt = script(&temp_dir, "apt-get", "echo 'E: Unable to locate package' >&2; exit 100");

        let report = Bootstrapper::new()
            .packages(vec!["a".into(), "b".into(), "cec-utils".into()])
            .use_sudo(false)
            .tools(query, apt)
            .run();

        assert_eq!(report.failed(), 2);
        assert_eq!(report.exit_code(), 2);
        assert!(matches!(
            report.packages[0].action,
            PackageAction::Failed(ref msg) if msg.contains("Unable to locate package")
        ));
    }

    #[test]
    fn test_missing_query_tool_fails_every_package() {
        let report = Bootstrapper::new()
            .packages(vec!["a".into()])
            .tools("pikiosk-no-such-dpkg", "pikiosk-no-such-apt")
            .run();
        assert_eq!(report.exit_code(), 1);
    }
}
