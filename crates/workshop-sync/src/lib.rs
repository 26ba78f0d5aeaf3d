//! `workshop_sync` - Offline-first capture and sync for workshop equipment records
//!
//! This library keeps engine and generator events captured in the field in a
//! durable local store and hands them to the remote workshop service when it is
//! reachable.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod record;
pub mod remote;
pub mod storage;
pub mod sync;

pub use capture::{CaptureReceipt, CaptureService};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{Collection, Equipment, Fields, Record};
pub use remote::{ApiClient, RemoteService};
pub use storage::{LocalStore, StorageStats};
pub use sync::{FailurePolicy, SyncCoordinator, SyncOutcome};
