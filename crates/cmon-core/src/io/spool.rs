//! Durable spool for events awaiting delivery
//!
//! When a spool directory is configured, every reported event is written here
//! instead of being posted inline. A later drain (triggered externally, e.g. by
//! `cmon spool send` from cron) is the only path that empties the spool.
//!
//! # File Layout
//!
//! ```text
//! <spool_dir>/
//!   spool.exception-<hash>            - pending record (compact JSON of the event fields)
//!   spool.deprecation-<hash>.sending  - claimed by a running drain, or orphaned by a crash
//!   .enqueue-XXXXXX                   - record being written, not yet published
//!   .drain.lock                       - advisory lock held by the drain trigger
//! ```
//!
//! `<hash>` is the content hash of the canonical payload, so two identical
//! events map to the same file and the second enqueue is a no-op.
//!
//! # Record Lifecycle
//!
//! 1. `enqueue()` writes a temp file and publishes it without clobbering
//! 2. `drain()` claims each pending record by renaming it to `<name>.sending`
//! 3. The claimed payload is delivered; on success the file is deleted
//! 4. On failure the pass stops and the record stays claimed until an
//!    operator runs `recover_claims()`
//!
//! The rename in step 2 is the only cross-process synchronization point: of
//! several drains racing for one record, exactly one rename succeeds.

use crate::delivery::DeliveryError;
use crate::event::{DeliveryEvent, EventFields, EventKind};
use crate::io::error::SpoolError;
use crate::io::hash::content_hash;
use crate::io::lock::DRAIN_LOCK_FILE;
use crate::payload::canonical_bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info, warn};

/// File name prefix shared by all spool records
pub const RECORD_PREFIX: &str = "spool.";

/// Suffix marking a record as claimed by a drain
pub const CLAIM_SUFFIX: &str = ".sending";

/// Field added to drained payloads: when the record entered the spool
pub const SEEN_FIELD: &str = "_seen";

const TEMP_PREFIX: &str = ".enqueue-";

/// Spool behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpoolOptions {
    /// Add `_seen` (record creation time, ISO-8601) to drained payloads
    pub stamp_seen: bool,
}

impl Default for SpoolOptions {
    fn default() -> Self {
        Self { stamp_seen: true }
    }
}

/// Result of an enqueue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new pending record was published
    Written { path: PathBuf },
    /// An identical record was already pending; nothing was written
    AlreadyPending { path: PathBuf },
}

impl EnqueueOutcome {
    pub fn path(&self) -> &Path {
        match self {
            EnqueueOutcome::Written { path } | EnqueueOutcome::AlreadyPending { path } => path,
        }
    }
}

/// Statistics from one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Records delivered and deleted
    pub delivered: usize,
    /// `.sending` records left alone (in flight elsewhere, or orphaned)
    pub skipped_claimed: usize,
    /// Files that are not spool records
    pub skipped_foreign: usize,
    /// Records another drain claimed first
    pub lost_claims: usize,
}

/// Snapshot of the spool directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpoolStatus {
    /// Records waiting for the next drain
    pub pending: usize,
    /// Records in `.sending` state
    pub claimed: usize,
    /// Other files in the directory
    pub foreign: usize,
}

/// Why a drain pass stopped early
///
/// Variants that name a `claimed` path leave that record in `.sending` state;
/// records not yet visited stay pending for the next pass.
#[derive(Debug, Error)]
pub enum DrainError {
    /// The endpoint rejected the record or could not be reached
    #[error("Drain aborted after {delivered} deliveries, {claimed} left claimed: {source}")]
    Delivery {
        claimed: PathBuf,
        delivered: usize,
        #[source]
        source: DeliveryError,
    },

    /// The claimed record could not be read, decoded or removed
    #[error("Drain aborted after {delivered} deliveries, {claimed} left claimed: {source}")]
    Record {
        claimed: PathBuf,
        delivered: usize,
        #[source]
        source: SpoolError,
    },

    /// The spool could not be listed, or a record could not be claimed
    #[error(transparent)]
    Spool(#[from] SpoolError),
}

/// Handle on an existing spool directory
#[derive(Debug, Clone)]
pub struct Spool {
    dir: PathBuf,
    options: SpoolOptions,
}

/// Kind encoded in a record file name, or `None` for anything else.
///
/// Record names look like `spool.<kind>-<hash>`. Claimed names
/// (`...sending`) must be filtered before calling this.
pub fn parse_record_name(name: &str) -> Option<EventKind> {
    let rest = name.strip_prefix(RECORD_PREFIX)?;
    let (kind, hash) = rest.split_once('-')?;
    if hash.is_empty() {
        return None;
    }
    EventKind::parse(kind)
}

/// File name of the pending record for a kind and content hash
pub fn record_name(kind: EventKind, hash: &str) -> String {
    format!("{RECORD_PREFIX}{kind}-{hash}")
}

fn claimed_path(path: &Path) -> PathBuf {
    let mut claimed = path.as_os_str().to_owned();
    claimed.push(CLAIM_SUFFIX);
    PathBuf::from(claimed)
}

/// Creation time of a record as ISO-8601 (`+00:00` offset).
///
/// Falls back to the modification time on file systems without birth time.
fn record_time(path: &Path) -> Option<String> {
    let metadata = fs::metadata(path).ok()?;
    let time = metadata.created().or_else(|_| metadata.modified()).ok()?;
    let time: DateTime<Utc> = time.into();
    Some(time.to_rfc3339_opts(SecondsFormat::Secs, false))
}

impl Spool {
    /// Open an existing spool directory.
    ///
    /// The directory is never created here: a configured but missing spool is
    /// a deployment error and must fail at startup.
    pub fn open(dir: impl Into<PathBuf>, options: SpoolOptions) -> Result<Self, SpoolError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(SpoolError::MissingDirectory { path: dir });
        }
        Ok(Self { dir, options })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn options(&self) -> SpoolOptions {
        self.options
    }

    /// Path of the advisory lock used by the drain trigger
    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(DRAIN_LOCK_FILE)
    }

    /// Path of the pending record an event would occupy
    pub fn record_path(&self, event: &DeliveryEvent) -> Result<PathBuf, SpoolError> {
        let bytes = canonical_bytes(&event.fields).map_err(|e| SpoolError::Json {
            path: self.dir.clone(),
            source: e,
        })?;
        Ok(self.dir.join(record_name(event.kind, &content_hash(&bytes))))
    }

    /// Persist an event for a later drain.
    ///
    /// Idempotent: if an identical record is already pending nothing is
    /// written. The payload goes to a temp file first and is published with a
    /// no-clobber link, so drains never see a partial record and two racing
    /// identical enqueues leave exactly one file.
    pub fn enqueue(&self, event: &DeliveryEvent) -> Result<EnqueueOutcome, SpoolError> {
        let bytes = canonical_bytes(&event.fields).map_err(|e| SpoolError::Json {
            path: self.dir.clone(),
            source: e,
        })?;
        let path = self
            .dir
            .join(record_name(event.kind, &content_hash(&bytes)));

        if path.exists() {
            debug!(path = %path.display(), "identical record already pending");
            return Ok(EnqueueOutcome::AlreadyPending { path });
        }

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| SpoolError::io(&self.dir, e))?;
        temp.write_all(&bytes)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| SpoolError::io(temp.path(), e))?;

        match temp.persist_noclobber(&path) {
            Ok(_) => {
                info!(kind = %event.kind, path = %path.display(), "event spooled");
                Ok(EnqueueOutcome::Written { path })
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "lost enqueue race to identical record");
                Ok(EnqueueOutcome::AlreadyPending { path })
            }
            Err(e) => Err(SpoolError::io(&path, e.error)),
        }
    }

    /// Deliver every pending record, in file-name order.
    ///
    /// `deliver` receives the record kind and its decoded fields (plus `_seen`
    /// when enabled). The first failure aborts the pass: the failing record
    /// stays claimed and later records stay pending.
    pub fn drain<F>(&self, mut deliver: F) -> Result<DrainReport, DrainError>
    where
        F: FnMut(EventKind, EventFields) -> Result<(), DeliveryError>,
    {
        let mut report = DrainReport::default();

        for (name, path) in self.list()? {
            if !path.is_file() || name == DRAIN_LOCK_FILE {
                continue;
            }

            if name.ends_with(CLAIM_SUFFIX) {
                debug!(path = %path.display(), "skipping claimed record");
                report.skipped_claimed += 1;
                continue;
            }

            let Some(kind) = parse_record_name(&name) else {
                debug!(path = %path.display(), "skipping file that is not a spool record");
                report.skipped_foreign += 1;
                continue;
            };

            // Read before the rename: it is the time the record entered the spool.
            let seen = if self.options.stamp_seen {
                record_time(&path)
            } else {
                None
            };

            let claimed = claimed_path(&path);
            match fs::rename(&path, &claimed) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "record claimed by another drain");
                    report.lost_claims += 1;
                    continue;
                }
                Err(e) => return Err(SpoolError::io(&path, e).into()),
            }

            let mut fields = match read_record(&claimed) {
                Ok(fields) => fields,
                // An identical record re-enqueued and claimed by a concurrent
                // drain can replace ours; that drain owns delivery now.
                Err(SpoolError::Io { ref source, .. }) if source.kind() == ErrorKind::NotFound => {
                    report.lost_claims += 1;
                    continue;
                }
                Err(source) => {
                    return Err(DrainError::Record {
                        claimed,
                        delivered: report.delivered,
                        source,
                    });
                }
            };

            if let Some(seen) = seen {
                fields.insert(SEEN_FIELD.into(), Value::String(seen));
            }

            if let Err(source) = deliver(kind, fields) {
                warn!(
                    path = %claimed.display(),
                    delivered = report.delivered,
                    "delivery failed, aborting drain: {source}"
                );
                return Err(DrainError::Delivery {
                    claimed,
                    delivered: report.delivered,
                    source,
                });
            }

            match fs::remove_file(&claimed) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(DrainError::Record {
                        claimed: claimed.clone(),
                        delivered: report.delivered,
                        source: SpoolError::io(&claimed, e),
                    });
                }
            }

            info!(kind = %kind, record = %name, "spooled event delivered");
            report.delivered += 1;
        }

        Ok(report)
    }

    /// Count pending, claimed and foreign files (the drain lock is not counted)
    pub fn status(&self) -> Result<SpoolStatus, SpoolError> {
        let mut status = SpoolStatus::default();

        for (name, path) in self.list()? {
            if !path.is_file() || name == DRAIN_LOCK_FILE {
                continue;
            }
            if name.ends_with(CLAIM_SUFFIX) {
                status.claimed += 1;
            } else if parse_record_name(&name).is_some() {
                status.pending += 1;
            } else {
                status.foreign += 1;
            }
        }

        Ok(status)
    }

    /// Return orphaned claims to the pending state.
    ///
    /// Only `.sending` records last modified at least `older_than` ago are
    /// touched. A record whose pending twin already exists is removed instead,
    /// since both hold the same payload. Returns the pending paths restored or
    /// superseded.
    ///
    /// Never called by `drain()`: a claim may belong to a drain that is still
    /// running, so callers should hold the drain lock.
    pub fn recover_claims(&self, older_than: Duration) -> Result<Vec<PathBuf>, SpoolError> {
        let now = SystemTime::now();
        let mut recovered = Vec::new();

        for (name, path) in self.list()? {
            let Some(base) = name.strip_suffix(CLAIM_SUFFIX) else {
                continue;
            };
            if parse_record_name(base).is_none() || !path.is_file() {
                continue;
            }

            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .map_err(|e| SpoolError::io(&path, e))?;
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age < older_than {
                debug!(path = %path.display(), age_secs = age.as_secs(), "claim too recent to recover");
                continue;
            }

            let pending = self.dir.join(base);
            if pending.exists() {
                fs::remove_file(&path).map_err(|e| SpoolError::io(&path, e))?;
                warn!(path = %path.display(), "removed orphaned claim superseded by pending twin");
            } else {
                fs::rename(&path, &pending).map_err(|e| SpoolError::io(&path, e))?;
                warn!(path = %pending.display(), age_secs = age.as_secs(), "restored orphaned claim");
            }
            recovered.push(pending);
        }

        Ok(recovered)
    }

    /// Directory entries as (file name, path), sorted by name.
    ///
    /// Names that are not valid UTF-8 cannot be records and are dropped.
    fn list(&self) -> Result<Vec<(String, PathBuf)>, SpoolError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| SpoolError::io(&self.dir, e))?;

        let mut listed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SpoolError::io(&self.dir, e))?;
            if let Ok(name) = entry.file_name().into_string() {
                listed.push((name, entry.path()));
            }
        }
        listed.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(listed)
    }
}

fn read_record(path: &Path) -> Result<EventFields, SpoolError> {
    let content = fs::read(path).map_err(|e| SpoolError::io(path, e))?;
    match serde_json::from_slice(&content) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(SpoolError::NotAnObject {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(SpoolError::Json {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
