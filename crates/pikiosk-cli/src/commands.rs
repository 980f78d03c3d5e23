//! Subcommand handlers. Each returns the process exit code.

use crate::{Args, Command};
use anyhow::{Context, Result};
use pikiosk_core::{
    Bootstrapper, BrowserLaunch, DeployConfig, Deployer, DiagnosticMode, Diagnostics,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info};

pub(crate) fn run(args: &Args) -> Result<i32> {
    match args.command {
        Command::Install {
            ref prerequisites,
            ref autostart,
        } => install(args, prerequisites, autostart),
        Command::Bootstrap {
            dry_run,
            no_sudo,
            ref packages,
        } => Ok(bootstrap(args, dry_run, no_sudo, packages)),
        Command::Diagnose { ref mode } => Ok(diagnose(args, mode.as_deref())),
        Command::Launch { print, ref url } => launch(args, print, url.as_deref()),
    }
}

fn deploy_config(args: &Args) -> Result<DeployConfig> {
    let repo = match args.repo {
        Some(ref repo) => repo.clone(),
        None => std::env::current_dir().context("Could not determine current directory")?,
    };
    let config = match args.home {
        Some(ref home) => DeployConfig::for_home(&repo, home),
        None => DeployConfig::from_environment(&repo)?,
    };
    debug!("Deploy layout: {:?}", config);
    Ok(config)
}

fn install(args: &Args, prerequisites: &[String], autostart: &[String]) -> Result<i32> {
    let mut config = deploy_config(args)?;
    if !prerequisites.is_empty() {
        config = config.with_prerequisites(prerequisites.to_vec());
    }
    if !autostart.is_empty() {
        config = config.with_autostart_entries(autostart.to_vec());
    }

    info!("Installing kiosk entries from {}", repo_label(&config.source_descriptor_dir));
    let report = Deployer::new(config)?.run();

    if args.json {
        print_json(&report)?;
    } else {
        print!("{}", report.render_summary());
    }
    Ok(report.exit_code())
}

fn bootstrap(args: &Args, dry_run: bool, no_sudo: bool, packages: &[String]) -> i32 {
    let mut bootstrapper = Bootstrapper::new().dry_run(dry_run);
    if no_sudo {
        bootstrapper = bootstrapper.use_sudo(false);
    }
    if !packages.is_empty() {
        bootstrapper = bootstrapper.packages(packages.to_vec());
    }

    let report = bootstrapper.run();
    if args.json {
        if let Err(e) = print_json(&report) {
            error!("{:#}", e);
        }
    } else {
        for package in &report.packages {
            println!("{:<20} {:?}", package.name, package.action);
        }
        println!("result: {} package(s) failed", report.failed());
    }
    report.exit_code()
}

fn diagnose(args: &Args, mode: Option<&str>) -> i32 {
    let mode = match mode.map(str::parse::<DiagnosticMode>) {
        None => DiagnosticMode::default(),
        Some(Ok(mode)) => mode,
        Some(Err(e)) => {
            error!("{}", e);
            print!("{}", DiagnosticMode::usage());
            return 1;
        }
    };
    if mode == DiagnosticMode::Help {
        print!("{}", DiagnosticMode::usage());
        return 0;
    }

    let report = Diagnostics::new().run(mode);
    if args.json {
        if let Err(e) = print_json(&report) {
            error!("{:#}", e);
        }
    } else {
        for step in &report.steps {
            let status = if step.passed { "ok" } else { "FAILED" };
            println!("== {} [{}]", step.name, status);
            if !step.detail.is_empty() {
                println!("{}", step.detail);
            }
        }
    }
    report.exit_code()
}

fn launch(args: &Args, print: bool, url: Option<&str>) -> Result<i32> {
    let config = deploy_config(args)?;
    let mut launch = BrowserLaunch::for_config(&config)?;
    if let Some(url) = url {
        launch = launch.with_url(url);
    }

    if print {
        println!("{}", launch.command_line());
        return Ok(0);
    }

    let status = launch
        .spawn()?
        .wait()
        .context("Failed to wait for the browser")?;
    Ok(status.code().unwrap_or(1))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn repo_label(dir: &std::path::Path) -> String {
    dir.parent()
        .and_then(|p| p.parent())
        .map(PathBuf::from)
        .unwrap_or_else(|| dir.to_path_buf())
        .display()
        .to_string()
}
