//! Pikiosk Core - idempotent kiosk desktop-entry deployment for a Raspberry Pi TV.
//!
//! Installs `.desktop` launcher entries and the static launcher bundle into a
//! user's menu and autostart directories, backing up anything it would
//! overwrite. Every step is safe to repeat, so re-running converges instead of
//! duplicating work. Package installation, HDMI-CEC and the browser itself are
//! external tools this crate only invokes.
//!
//! # Example
//!
//! ```rust,ignore
//! use pikiosk_core::{DeployConfig, Deployer};
//!
//! fn main() -> pikiosk_core::Result<()> {
//!     let config = DeployConfig::from_environment("/home/pi/pikiosk")?;
//!     let report = Deployer::new(config)?.run();
//!
//!     print!("{}", report.render_summary());
//!     std::process::exit(report.exit_code());
//! }
//! ```

pub mod bootstrap;
pub mod browser;
pub mod config;
pub mod deploy;
pub mod desktop;
pub mod diagnostics;
pub mod error;
pub mod install;
pub mod platform;

// Re-export commonly used types
pub use bootstrap::{BootstrapReport, Bootstrapper, PackageAction};
pub use browser::BrowserLaunch;
pub use config::{DeployConfig, DesktopConfig, ProcessConfig};
pub use deploy::{DeployReport, DeployState, Deployer, RunOutcome, StepFailure};
pub use desktop::DesktopEntry;
pub use diagnostics::{DiagnosticMode, DiagnosticReport, Diagnostics};
pub use error::{KioskError, Result};
pub use install::{InstallOutcome, PrerequisiteStatus, RefreshOutcome};
