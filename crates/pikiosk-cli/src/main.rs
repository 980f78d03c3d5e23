//! Pikiosk CLI - sets up and maintains a Raspberry Pi kiosk TV.
//!
//! `install` deploys the launcher entries, `bootstrap` installs the system
//! packages, `diagnose` checks HDMI-CEC and the network and `launch` starts
//! the browser in kiosk mode. The exit code is the number of failed steps.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pikiosk")]
#[command(about = "Kiosk TV appliance setup for Raspberry Pi", version)]
pub(crate) struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Repository checkout holding files/desktop and files/launcher (defaults to current directory)
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// Home directory to deploy into (defaults to the current user's)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    /// Install menu entries, launcher assets and autostart entries
    Install {
        /// Browser binary that must be present (repeatable)
        #[arg(long = "prerequisite")]
        prerequisites: Vec<String>,

        /// Descriptor file to register for autostart (repeatable)
        #[arg(long = "autostart")]
        autostart: Vec<String>,
    },

    /// Install the browser and CEC packages
    Bootstrap {
        /// Only report what would be installed
        #[arg(long)]
        dry_run: bool,

        /// Do not prefix apt-get with sudo
        #[arg(long)]
        no_sudo: bool,

        /// Package to ensure instead of the defaults (repeatable)
        #[arg(long = "package")]
        packages: Vec<String>,
    },

    /// Run HDMI-CEC and network diagnostics
    Diagnose {
        /// scan, test, interactive, addresses or help
        mode: Option<String>,
    },

    /// Start the browser in kiosk mode
    Launch {
        /// Print the command line instead of running it
        #[arg(long)]
        print: bool,

        /// Page to open (defaults to the deployed launcher)
        #[arg(long)]
        url: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging; stdout is reserved for the report
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let code = commands::run(&args)?;
    std::process::exit(code);
}
