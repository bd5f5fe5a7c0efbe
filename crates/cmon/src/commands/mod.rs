//! CLI command dispatch and execution

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use code_monitor_core::config::{resolve_config, ConfigOverrides};
use code_monitor_core::home::get_home_dir;
use code_monitor_core::MonitorConfig;
use std::path::PathBuf;

mod report;
mod spool;

/// cmon - report application errors and drain the monitoring spool
#[derive(Parser, Debug)]
#[command(
    name = "cmon",
    version,
    about = "Report application errors and deprecations to a monitoring endpoint",
    long_about = "Reports exceptions and deprecation notices to a monitoring endpoint, either \
                  inline or through a local spool directory drained by `cmon spool send`"
)]
pub struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Configuration overrides shared by every command
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Config file to use instead of the repo-local .cmon.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Monitoring endpoint base URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Project identifier
    #[arg(long, global = true)]
    project: Option<String>,

    /// Environment identifier
    #[arg(long, global = true)]
    environment: Option<String>,

    /// Shared secret
    #[arg(long, global = true)]
    secret: Option<String>,

    /// Spool directory (enables spooling)
    #[arg(long, global = true)]
    spool_dir: Option<PathBuf>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<MonitorConfig> {
        let home_dir = get_home_dir()?;
        let current_dir = std::env::current_dir()?;

        let overrides = ConfigOverrides {
            endpoint: self.endpoint.clone(),
            project: self.project.clone(),
            environment: self.environment.clone(),
            secret: self.secret.clone(),
            spool_dir: self.spool_dir.clone(),
            config_path: self.config.clone(),
        };

        resolve_config(&overrides, &current_dir, &home_dir).context("Failed to load configuration")
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect and drain the delivery spool
    #[command(subcommand)]
    Spool(spool::SpoolCommand),

    /// Report an event
    #[command(subcommand)]
    Report(report::ReportCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let config = self.config.resolve()?;

        match self.command {
            Commands::Spool(command) => spool::execute(command, &config),
            Commands::Report(command) => report::execute(command, &config),
        }
    }
}
