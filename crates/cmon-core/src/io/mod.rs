//! File-system side of the engine
//!
//! - **Spool**: durable holding area for events awaiting delivery, with
//!   atomic claim-by-rename so concurrent drains never double-send a record
//! - **Content hashing**: stable names for identical events, so repeated
//!   reports collapse into a single pending record
//! - **File locking**: advisory lock used by the drain trigger to run one
//!   drain at a time per spool directory

pub mod error;
pub mod hash;
pub mod lock;
pub mod spool;

pub use error::SpoolError;
pub use lock::{try_acquire_lock, FileLock};
pub use spool::{DrainError, DrainReport, EnqueueOutcome, Spool, SpoolOptions, SpoolStatus};
