//! Advisory file locking for the drain trigger
//!
//! Claiming a record is already atomic, so the lock is not needed for
//! correctness. It keeps one drain per spool directory at a time so that
//! scheduled invocations do not interleave their passes.

use crate::io::error::SpoolError;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Name of the drain lock file inside the spool directory.
///
/// It does not carry the `spool.` prefix, so drains never mistake it for a record.
pub const DRAIN_LOCK_FILE: &str = ".drain.lock";

/// File lock guard that automatically releases on drop
pub struct FileLock {
    #[allow(dead_code)]
    file: File,
    #[cfg(unix)]
    fd: i32,
    #[cfg(not(unix))]
    path: std::path::PathBuf,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            unsafe {
                libc::flock(self.fd, libc::LOCK_UN);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Acquire an exclusive lock on a file with backoff retry
///
/// Waits 50ms, 100ms, 200ms, ... between attempts. With `max_retries` of 0
/// a single non-blocking attempt is made.
///
/// Returns `SpoolError::LockTimeout` if the lock is still held after all retries.
pub fn acquire_lock(path: &Path, max_retries: u32) -> Result<FileLock, SpoolError> {
    #[cfg(unix)]
    {
        unix_acquire_lock(path, max_retries)
    }

    #[cfg(not(unix))]
    {
        fallback_acquire_lock(path, max_retries)
    }
}

/// Single non-blocking attempt; `Ok(None)` when another process holds the lock
pub fn try_acquire_lock(path: &Path) -> Result<Option<FileLock>, SpoolError> {
    match acquire_lock(path, 0) {
        Ok(lock) => Ok(Some(lock)),
        Err(SpoolError::LockTimeout { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

fn backoff(attempt: u32) {
    let wait_ms = 50u64 * (1 << attempt.min(10));
    std::thread::sleep(Duration::from_millis(wait_ms));
}

#[cfg(unix)]
fn unix_acquire_lock(path: &Path, max_retries: u32) -> Result<FileLock, SpoolError> {
    use std::fs::OpenOptions;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| SpoolError::io(path, e))?;

    let fd = file.as_raw_fd();

    for attempt in 0..=max_retries {
        let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };

        if result == 0 {
            return Ok(FileLock { file, fd });
        }

        let err = std::io::Error::last_os_error();
        let would_block = err.raw_os_error() == Some(libc::EWOULDBLOCK)
            || err.raw_os_error() == Some(libc::EAGAIN);

        if !would_block {
            return Err(SpoolError::io(path, err));
        }

        if attempt < max_retries {
            backoff(attempt);
        }
    }

    Err(SpoolError::LockTimeout {
        path: path.to_path_buf(),
        retries: max_retries,
    })
}

// Without flock, exclusive creation of the lock file stands in for the lock.
#[cfg(not(unix))]
fn fallback_acquire_lock(path: &Path, max_retries: u32) -> Result<FileLock, SpoolError> {
    use std::fs::OpenOptions;

    for attempt in 0..=max_retries {
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(file) => {
                return Ok(FileLock {
                    file,
                    path: path.to_path_buf(),
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if attempt < max_retries {
                    backoff(attempt);
                }
            }
            Err(e) => return Err(SpoolError::io(path, e)),
        }
    }

    Err(SpoolError::LockTimeout {
        path: path.to_path_buf(),
        retries: max_retries,
    })
}
