//! Kiosk browser command line.

use crate::config::{BrowserConfig, DeployConfig};
use crate::error::{KioskError, Result};
use crate::platform::{find_program, process::describe};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::info;
use url::Url;

/// A browser invocation in kiosk mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserLaunch {
    pub binary: PathBuf,
    pub url: String,
    pub user_agent: String,
    pub extra_flags: Vec<String>,
}

impl BrowserLaunch {
    pub fn new(binary: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            url: url.into(),
            user_agent: BrowserConfig::TV_USER_AGENT.to_string(),
            extra_flags: Vec::new(),
        }
    }

    /// Launch the first available browser from `config.prerequisites` at the
    /// deployed entry page.
    pub fn for_config(config: &DeployConfig) -> Result<Self> {
        let binary = config
            .prerequisites
            .iter()
            .find_map(|name| find_program(name))
            .ok_or_else(|| KioskError::PrerequisiteMissing {
                candidates: config.prerequisites.clone(),
            })?;
        Ok(Self::new(binary, file_url(&config.entry_page_path())?))
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.extra_flags.push(flag.into());
        self
    }

    /// Arguments in launch order; the URL is always last.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = BrowserConfig::KIOSK_FLAGS
            .iter()
            .map(|f| f.to_string())
            .collect();
        args.push(format!("--user-agent={}", self.user_agent));
        args.extend(self.extra_flags.iter().cloned());
        args.push(self.url.clone());
        args
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command.args(self.args());
        command
    }

    /// Shell-quoted command line, suitable for an `Exec=` value.
    pub fn command_line(&self) -> String {
        let binary = self.binary.to_string_lossy().into_owned();
        shell_words::join(std::iter::once(binary).chain(self.args()))
    }

    /// Start the browser without waiting for it.
    pub fn spawn(&self) -> Result<Child> {
        let mut command = self.command();
        let description = describe(&command);
        info!("Launching {}", self.binary.display());
        command
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| KioskError::CommandFailed {
                command: description,
                message: e.to_string(),
            })
    }
}

/// `file://` URL for an absolute local path.
pub fn file_url(path: &Path) -> Result<String> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| KioskError::Validation {
            field: "url".to_string(),
            message: format!("{} is not an absolute path", path.display()),
        })
}
