//! HDMI-CEC and network diagnostics.
//!
//! Thin wrappers around `cec-client`, `getent`, `ping` and `hostname`; the
//! CEC protocol itself is entirely the tool's business. Each mode runs one or
//! more sub-steps and the exit code is the number that failed.

use crate::config::ProcessConfig;
use crate::error::{KioskError, Result};
use crate::platform::process::{describe, run_attached, run_with_timeout, CommandOutput};
use serde::Serialize;
use std::fmt;
use std::process::Command;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

/// Diagnostic mode selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticMode {
    #[default]
    Scan,
    Test,
    Interactive,
    Addresses,
    Help,
}

impl DiagnosticMode {
    pub const ALL: [DiagnosticMode; 5] = [
        DiagnosticMode::Scan,
        DiagnosticMode::Test,
        DiagnosticMode::Interactive,
        DiagnosticMode::Addresses,
        DiagnosticMode::Help,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticMode::Scan => "scan",
            DiagnosticMode::Test => "test",
            DiagnosticMode::Interactive => "interactive",
            DiagnosticMode::Addresses => "addresses",
            DiagnosticMode::Help => "help",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            DiagnosticMode::Scan => "scan the HDMI-CEC bus for devices (default)",
            DiagnosticMode::Test => "check CEC adapter, DNS resolution and reachability",
            DiagnosticMode::Interactive => "open an interactive cec-client session",
            DiagnosticMode::Addresses => "show this device's network addresses",
            DiagnosticMode::Help => "show this help",
        }
    }

    /// Usage text listing every mode.
    pub fn usage() -> String {
        let mut out = String::from("Usage: pikiosk diagnose [MODE]\n\nModes:\n");
        for mode in Self::ALL {
            out.push_str(&format!("  {:<12} {}\n", mode.as_str(), mode.description()));
        }
        out
    }
}

impl FromStr for DiagnosticMode {
    type Err = KioskError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| KioskError::Validation {
                field: "mode".to_string(),
                message: format!("unknown diagnostic mode '{}'", s),
            })
    }
}

impl fmt::Display for DiagnosticMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One diagnostic sub-step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticStep {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Result of a diagnostic run.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub mode: DiagnosticMode,
    pub steps: Vec<DiagnosticStep>,
}

impl DiagnosticReport {
    /// Number of failed sub-steps (clamped to 255).
    pub fn exit_code(&self) -> i32 {
        self.steps.iter().filter(|s| !s.passed).count().min(255) as i32
    }
}

/// Runs diagnostic modes against configurable tools.
pub struct Diagnostics {
    cec_tool: String,
    dns_host: String,
    ping_host: String,
    scan_timeout: Duration,
    check_timeout: Duration,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            cec_tool: "cec-client".to_string(),
            dns_host: "raspberrypi.org".to_string(),
            ping_host: "1.1.1.1".to_string(),
            scan_timeout: ProcessConfig::CEC_SCAN_TIMEOUT,
            check_timeout: ProcessConfig::NETWORK_CHECK_TIMEOUT,
        }
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cec_tool(mut self, tool: impl Into<String>) -> Self {
        self.cec_tool = tool.into();
        self
    }

    pub fn with_hosts(mut self, dns_host: impl Into<String>, ping_host: impl Into<String>) -> Self {
        self.dns_host = dns_host.into();
        self.ping_host = ping_host.into();
        self
    }

    pub fn with_timeouts(mut self, scan: Duration, check: Duration) -> Self {
        self.scan_timeout = scan;
        self.check_timeout = check;
        self
    }

    /// Run `mode` and collect its sub-steps.
    pub fn run(&self, mode: DiagnosticMode) -> DiagnosticReport {
        let steps = match mode {
            DiagnosticMode::Scan => vec![self.cec_scan()],
            DiagnosticMode::Test => vec![
                self.cec_adapters(),
                self.dns_lookup(),
                self.reachability(),
            ],
            DiagnosticMode::Interactive => vec![self.interactive()],
            DiagnosticMode::Addresses => vec![self.addresses()],
            DiagnosticMode::Help => Vec::new(),
        };

        for step in &steps {
            if step.passed {
                info!("{}: ok", step.name);
            } else {
                error!("{}: {}", step.name, step.detail);
            }
        }

        DiagnosticReport { mode, steps }
    }

    fn cec_scan(&self) -> DiagnosticStep {
        let mut command = Command::new(&self.cec_tool);
        command.args(["-s", "-d", "1"]);
        step(
            "cec scan",
            command,
            Some(b"scan\n"),
            self.scan_timeout,
            |out| out.success(),
        )
    }

    fn cec_adapters(&self) -> DiagnosticStep {
        let mut command = Command::new(&self.cec_tool);
        command.arg("-l");
        step("cec adapter", command, None, self.check_timeout, |out| {
            out.success() && !out.stdout.contains("Found devices: NONE")
        })
    }

    fn dns_lookup(&self) -> DiagnosticStep {
        let mut command = Command::new("getent");
        command.args(["hosts", &self.dns_host]);
        step("dns lookup", command, None, self.check_timeout, |out| {
            out.success() && !out.stdout.trim().is_empty()
        })
    }

    fn reachability(&self) -> DiagnosticStep {
        let mut command = Command::new("ping");
        command.args(["-c", "1", "-W", "2", &self.ping_host]);
        step("reachability", command, None, self.check_timeout, |out| {
            out.success()
        })
    }

    fn addresses(&self) -> DiagnosticStep {
        let mut command = Command::new("hostname");
        command.arg("-I");
        step("addresses", command, None, self.check_timeout, |out| {
            out.success() && !out.stdout.trim().is_empty()
        })
    }

    fn interactive(&self) -> DiagnosticStep {
        let command = Command::new(&self.cec_tool);
        let name = "interactive";
        match run_attached(command) {
            Ok(status) => DiagnosticStep {
                name: name.to_string(),
                passed: status.success(),
                detail: format!("{} exited with {}", self.cec_tool, status),
            },
            Err(e) => DiagnosticStep {
                name: name.to_string(),
                passed: false,
                detail: e.to_string(),
            },
        }
    }
}

fn step(
    name: &str,
    command: Command,
    stdin: Option<&[u8]>,
    timeout: Duration,
    passed: impl Fn(&CommandOutput) -> bool,
) -> DiagnosticStep {
    let description = describe(&command);
    match run_with_timeout(command, stdin, timeout) {
        Ok(output) => {
            let ok = passed(&output);
            let detail = if ok || !output.stdout.trim().is_empty() {
                output.stdout.trim_end().to_string()
            } else {
                output
                    .first_line()
                    .unwrap_or_else(|| format!("`{}` exited with {}", description, output.status))
            };
            DiagnosticStep {
                name: name.to_string(),
                passed: ok,
                detail,
            }
        }
        Err(e) => DiagnosticStep {
            name: name.to_string(),
            passed: false,
            detail: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("scan".parse::<DiagnosticMode>().unwrap(), DiagnosticMode::Scan);
        assert_eq!(
            "ADDRESSES".parse::<DiagnosticMode>().unwrap(),
            DiagnosticMode::Addresses
        );
        assert!("reboot".parse::<DiagnosticMode>().is_err());
        assert_eq!(DiagnosticMode::default(), DiagnosticMode::Scan);
    }

    #[test]
    fn test_usage_lists_every_mode() {
        let usage = DiagnosticMode::usage();
        for mode in DiagnosticMode::ALL {
            assert!(usage.contains(mode.as_str()));
        }
    }

    #[test]
    fn test_help_has_no_steps() {
        let report = Diagnostics::new().run(DiagnosticMode::Help);
        assert!(report.steps.is_empty());
        assert_eq!(report.exit_code(), 0);
    }

    #[cfg(unix)]
    mod with_fake_tools {
        use super::*;
        use crate::platform;
        use std::fs;
        use tempfile::TempDir;

        fn script(dir: &TempDir, name: &str, body: &str) -> String {
            let path = dir.path().join(name);
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            platform::set_executable(&path).unwrap();
            path.to_string_lossy().into_owned()
        }

        #[test]
        fn test_scan_feeds_scan_command() {
            let temp_dir = TempDir::new().unwrap();
            let cec = script(
                &temp_dir,
                "cec-client",
                r#"read cmd; echo "got $cmd"; echo "device #0: TV""#,
            );

            let report = Diagnostics::new().with_cec_tool(cec).run(DiagnosticMode::Scan);

            assert_eq!(report.exit_code(), 0);
            assert!(report.steps[0].detail.contains("got scan"));
            assert!(report.steps[0].detail.contains("device #0: TV"));
        }

        #[test]
        fn test_scan_failure_counts() {
            let temp_dir = TempDir::new().unwrap();
            let cec = script(&temp_dir, "cec-client", "echo 'could not open adapter' >&2; exit 1");

            let report = Diagnostics::new().with_cec_tool(cec).run(DiagnosticMode::Scan);

            assert_eq!(report.exit_code(), 1);
            assert_eq!(report.steps[0].detail, "could not open adapter");
        }

        #[test]
        fn test_scan_timeout_counts() {
            let temp_dir = TempDir::new().unwrap();
            let cec = script(&temp_dir, "cec-client", "sleep 10");

            let report = Diagnostics::new()
                .with_cec_tool(cec)
                .with_timeouts(Duration::from_millis(300), Duration::from_millis(300))
                .run(DiagnosticMode::Scan);

            assert_eq!(report.exit_code(), 1);
            assert!(report.steps[0].detail.contains("timed out"));
        }

        #[test]
        fn test_missing_adapter_fails_test_step() {
            let temp_dir = TempDir::new().unwrap();
            let cec = script(&temp_dir, "cec-client", "echo 'Found devices: NONE'");

            let step = Diagnostics::new().with_cec_tool(cec).cec_adapters();
            assert!(!step.passed);
        }
    }
}
