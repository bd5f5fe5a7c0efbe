//! Report commands - hand an event to the delivery engine

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use code_monitor_core::exception_log::ExceptionLog;
use code_monitor_core::{
    DeliveryEvent, DeprecationDetail, Dispatch, EnqueueOutcome, ExceptionDetail, MonitorConfig, Transmitter,
};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Report an application error
    Exception(ExceptionArgs),

    /// Report a deprecation notice
    Deprecation(DeprecationArgs),
}

/// Rendered event text, inline or from a file
#[derive(Args, Debug)]
pub struct ContentsArgs {
    /// Rendered text (defaults to the message)
    #[arg(long, conflicts_with = "contents_file")]
    contents: Option<String>,

    /// Read the rendered text from a file ("-" for stdin)
    #[arg(long)]
    contents_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExceptionArgs {
    /// Error message
    #[arg(long)]
    message: String,

    #[command(flatten)]
    contents: ContentsArgs,

    /// The error was already handled by the application
    #[arg(long)]
    caught: bool,

    /// Source file
    #[arg(long, requires = "line")]
    file: Option<String>,

    /// Source line
    #[arg(long, requires = "file")]
    line: Option<u32>,

    /// Identifier of the active user
    #[arg(long)]
    user: Option<String>,

    /// Correlation token (profiler or trace id)
    #[arg(long)]
    token: Option<String>,

    /// Post immediately even when spooling is enabled
    #[arg(long)]
    now: bool,
}

#[derive(Args, Debug)]
pub struct DeprecationArgs {
    /// File that triggered the notice
    #[arg(long)]
    file: String,

    /// Line that triggered the notice
    #[arg(long)]
    line: u32,

    /// Deprecation message
    #[arg(long)]
    message: String,

    #[command(flatten)]
    contents: ContentsArgs,
}

/// Execute a report command
pub fn execute(command: ReportCommand, config: &MonitorConfig) -> Result<()> {
    match command {
        ReportCommand::Exception(args) => report_exception(args, config),
        ReportCommand::Deprecation(args) => report_deprecation(args, config),
    }
}

fn report_exception(args: ExceptionArgs, config: &MonitorConfig) -> Result<()> {
    let contents = args.contents.resolve(&args.message)?;
    let mut detail = ExceptionDetail::new(args.message, contents, args.caught);
    if let (Some(file), Some(line)) = (args.file, args.line) {
        detail = detail.at(file, line);
    }
    if let Some(user) = args.user {
        detail = detail.with_user(user);
    }
    if let Some(token) = args.token {
        detail = detail.with_token(token);
    }

    if let Some(dir) = &config.exception_log_dir {
        let log = ExceptionLog::new(dir)
            .with_context(|| format!("Failed to create exception log directory {}", dir.display()))?;
        let path = log.write(&detail).context("Failed to write exception log")?;
        println!("Logged {}", path.display());
    }

    let transmitter = Transmitter::new(config)?;
    if args.now {
        transmitter.send_now(&DeliveryEvent::exception(&detail))?;
        print_dispatch(&Dispatch::Sent);
        return Ok(());
    }

    let dispatch = transmitter.report_exception(&detail)?;
    print_dispatch(&dispatch);
    Ok(())
}

fn report_deprecation(args: DeprecationArgs, config: &MonitorConfig) -> Result<()> {
    let contents = args.contents.resolve(&args.message)?;
    let detail = DeprecationDetail::new(args.file, args.line, args.message, contents);

    let transmitter = Transmitter::new(config)?;
    let dispatch = transmitter.report_deprecation(&detail)?;
    print_dispatch(&dispatch);
    Ok(())
}

impl ContentsArgs {
    fn resolve(&self, message: &str) -> Result<String> {
        if let Some(contents) = &self.contents {
            return Ok(contents.clone());
        }
        match &self.contents_file {
            Some(path) => read_contents(path),
            None => Ok(message.to_string()),
        }
    }
}

fn read_contents(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read contents from stdin")?;
        return Ok(buffer);
    }

    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read contents file {}", path.display()))
}

fn print_dispatch(dispatch: &Dispatch) {
    match dispatch {
        Dispatch::Sent => println!("Sent"),
        Dispatch::Spooled(EnqueueOutcome::Written { path }) => {
            println!("Spooled {}", path.display())
        }
        Dispatch::Spooled(EnqueueOutcome::AlreadyPending { path }) => {
            println!("Already spooled {}", path.display())
        }
    }
}
