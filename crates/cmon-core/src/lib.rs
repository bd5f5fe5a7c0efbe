//! Reliable delivery engine for application monitoring events
//!
//! Reports exceptions and deprecation notices to a remote monitoring endpoint.
//! Events are either posted immediately or, when a spool directory is
//! configured, persisted to that directory so a later drain can deliver them.
//!
//! Spool records are plain files named `spool.<kind>-<hash>`; a drain claims a
//! record by renaming it to `<name>.sending` before posting it, and deletes it
//! once the endpoint has accepted it.

pub mod config;
pub mod delivery;
pub mod error;
pub mod event;
pub mod exception_log;
pub mod home;
pub mod io;
pub mod logging;
pub mod payload;
pub mod transmitter;

pub use config::{MonitorConfig, ProjectContext};
pub use delivery::{Delivery, DeliveryError, HttpTransport, Transport};
pub use error::MonitorError;
pub use event::{DeliveryEvent, DeprecationDetail, EventFields, EventKind, ExceptionDetail};
pub use io::spool::{DrainReport, EnqueueOutcome, Spool, SpoolOptions, SpoolStatus};
pub use transmitter::{Dispatch, Transmitter};
