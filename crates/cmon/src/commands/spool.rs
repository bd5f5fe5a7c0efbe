//! Spool commands - drain the spool and manage its records

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use code_monitor_core::io::lock::DRAIN_LOCK_FILE;
use code_monitor_core::io::try_acquire_lock;
use code_monitor_core::{MonitorConfig, Spool, SpoolOptions, Transmitter};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const ALREADY_RUNNING: &str = "The command is already running in another process.";

#[derive(Subcommand, Debug)]
pub enum SpoolCommand {
    /// Deliver every pending spooled event
    Send,

    /// Count pending and claimed records
    Status(StatusArgs),

    /// Return abandoned claims to the pending set
    Recover(RecoverArgs),
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
pub struct RecoverArgs {
    /// Only recover claims untouched for at least this many seconds
    #[arg(long, default_value_t = 3600)]
    older_than: u64,
}

/// Execute a spool command
pub fn execute(command: SpoolCommand, config: &MonitorConfig) -> Result<()> {
    match command {
        SpoolCommand::Send => send(config),
        SpoolCommand::Status(args) => status(args, config),
        SpoolCommand::Recover(args) => recover(args, config),
    }
}

fn send(config: &MonitorConfig) -> Result<()> {
    let Some(spool_dir) = &config.spool_dir else {
        println!("Spooling is disabled; nothing to send.");
        return Ok(());
    };

    let transmitter = Transmitter::new(config)?;

    let lock_path = spool_dir.join(DRAIN_LOCK_FILE);
    let Some(_lock) = try_acquire_lock(&lock_path)? else {
        println!("{ALREADY_RUNNING}");
        return Ok(());
    };
    debug!(lock = %lock_path.display(), "drain lock acquired");

    let report = transmitter
        .drain_spool()
        .context("Spool drain stopped; remaining records stay queued for the next run")?;

    println!("Delivered {} event(s)", report.delivered);
    if report.skipped_claimed > 0 {
        println!(
            "Skipped {} claimed record(s); run `cmon spool recover` if no drain is in progress",
            report.skipped_claimed
        );
    }
    if report.lost_claims > 0 {
        println!("{} record(s) were claimed by another drain", report.lost_claims);
    }

    Ok(())
}

fn status(args: StatusArgs, config: &MonitorConfig) -> Result<()> {
    let spool = open_spool(config)?;
    let status = spool.status()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Spool: {}", spool.dir().display());
    println!("  Pending: {}", status.pending);
    println!("  Claimed: {}", status.claimed);
    if status.foreign > 0 {
        println!("  Other files: {}", status.foreign);
    }

    Ok(())
}

fn recover(args: RecoverArgs, config: &MonitorConfig) -> Result<()> {
    let spool = open_spool(config)?;

    let Some(_lock) = try_acquire_lock(&spool.lock_path())? else {
        println!("{ALREADY_RUNNING}");
        return Ok(());
    };

    let recovered = spool.recover_claims(Duration::from_secs(args.older_than))?;
    for path in &recovered {
        println!("Recovered {}", display_name(path));
    }
    println!("Recovered {} claim(s)", recovered.len());

    Ok(())
}

fn open_spool(config: &MonitorConfig) -> Result<Spool> {
    let Some(spool_dir) = &config.spool_dir else {
        anyhow::bail!("No spool directory configured. Set spool_dir in .cmon.toml or CMON_SPOOL_DIR");
    };

    let options = SpoolOptions {
        stamp_seen: config.stamp_seen,
    };
    Ok(Spool::open(spool_dir, options)?)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
