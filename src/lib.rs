// src/lib.rs

//! System purpose sync
//!
//! Keeps a machine's system purpose attributes (role, usage, service
//! level, add-ons) consistent between the local syspurpose file and the
//! entitlement server it is registered to.
//!
//! # Architecture
//!
//! - Three copies: the user-editable local file, a cache of the last
//!   state agreed with the server, and the server itself
//! - Three-way merge: the cache is the common ancestor, so each side's
//!   edits are detected instead of guessed
//! - Graceful degradation: any server failure turns a sync into a
//!   local-only one; only local I/O errors are fatal
//! - Falsy asymmetry: the local file never stores cleared fields, the
//!   cache always does

pub mod attributes;
pub mod config;
mod error;
pub mod identity;
pub mod merge;
pub mod remote;
pub mod store;
pub mod sync;

pub use attributes::{Contents, Field, SyspurposeAttributes, Value};
pub use config::{SyspurposeConfig, DEFAULT_CONFIG_PATH};
pub use error::{Error, Result};
pub use identity::{CertificateIdentity, ConsumerIdentity, StaticIdentity};
pub use merge::{
    detect_changed, three_way_merge, ChangeOrigin, ChangeSource, Changed, ConflictPolicy,
    DiffChange, MergeOutcome,
};
pub use remote::{
    CandlepinClient, OfflineGateway, RemoteError, RemoteGateway, RemoteUpdate, ValidFields,
};
pub use store::{CacheStore, LocalStore};
pub use sync::{SyncMode, SyncReport, SyncResult, SyncedStore, ValidationWarning};
