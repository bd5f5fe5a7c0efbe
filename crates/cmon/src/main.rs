//! cmon - report monitoring events and drain the delivery spool
//!
//! A thin CLI over `code-monitor-core`. `cmon spool send` is the drain trigger
//! meant for cron or a systemd timer; `cmon report` lets scripts and non-Rust
//! hosts report events through the same engine.

use clap::Parser;

mod commands;

use commands::Cli;

fn main() {
    code_monitor_core::logging::init();

    let cli = Cli::parse();

    if let Err(e) = cli.execute() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
