//! Local copy of reported exceptions
//!
//! Each reported exception can also be written to a log directory as a plain
//! text file, so operators still have the rendered error when the monitoring
//! endpoint is unreachable or the spool has not been drained yet.

use crate::event::ExceptionDetail;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Writes `<dir>/[caught_]<seconds><micros>.log` files
#[derive(Debug, Clone)]
pub struct ExceptionLog {
    dir: PathBuf,
}

impl ExceptionLog {
    /// Use `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the rendered contents; returns the new file's path.
    ///
    /// Names carry microsecond resolution; `create_new` refuses to overwrite if
    /// two reports still collide, and the next microsecond is tried instead.
    pub fn write(&self, detail: &ExceptionDetail) -> io::Result<PathBuf> {
        let prefix = if detail.caught { "caught_" } else { "" };
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let mut micros = u64::from(now.subsec_micros());

        loop {
            let path = self
                .dir
                .join(format!("{prefix}{}{micros:06}.log", now.as_secs()));
            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    io::Write::write_all(&mut file, detail.contents.as_bytes())?;
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => micros += 1,
                Err(e) => return Err(e),
            }
        }
    }
}
