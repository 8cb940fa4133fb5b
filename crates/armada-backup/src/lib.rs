//! Backup and restore lifecycle management for Armada
//!
//! Backups are asynchronous control-plane resources owned by a cluster:
//! triggering one returns immediately and the backup then runs to
//! completion remotely. This crate drives backup creation and deletion
//! to quiescence, and provisions new clusters from existing backups.

#![deny(missing_docs)]

pub mod api;
pub mod lifecycle;
pub mod types;

pub use api::{BackupApi, RestoreApi};
pub use lifecycle::{BackupConfig, BackupManager, RestoreManager};
pub use types::{Backup, BackupState, Restore, RestoreState};
