//! Backup and sync of the local tables
//!
//! Snapshots travel as a [`BackupDocument`]; gzip on the remote side, plain
//! JSON on local disk.
//!
//! # Feature Flags
//!
//! The Google Drive client requires the `drive` feature (on by default).
//! [`MemoryRemoteStore`] is always available.

pub mod dates;
mod document;
#[cfg(feature = "drive")]
mod drive;
mod orchestrator;
mod remote;
pub mod settings;

pub use dates::fix_date;
pub use document::BackupDocument;
#[cfg(feature = "drive")]
pub use drive::DriveClient;
pub use orchestrator::{DataSync, ImportReport, SyncPhase};
pub use remote::{FileMeta, MemoryRemoteStore, RemoteStore};
pub use settings::{JsonFileSettings, MemorySettings, SettingsStore};
