//! Backup and restore lifecycle operations
//!
//! Same shape as cluster operations: mutating call, state poll to
//! quiescence, expected-state comparison. Backup creation additionally
//! gates on the owning cluster while the backup resource is transiently
//! absent from the control plane's listing.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use armada_cluster::types::ClusterConfig;
use armada_common::poll::{Observed, PollConfig, StatePoller};
use armada_common::{Error, Result, DEFAULT_POLL_DELAY, DEFAULT_POLL_INTERVAL};

use crate::api::{BackupApi, RestoreApi};
use crate::types::{Backup, BackupState, Restore, RestoreState};

/// Deadlines and poll pacing for backup operations
#[derive(Clone, Debug)]
pub struct BackupConfig {
    /// Deadline for a backup to complete
    pub create_timeout: Duration,
    /// Deadline for a backup to disappear after deletion
    pub delete_timeout: Duration,
    /// Deadline for a restore to provision its cluster
    pub restore_timeout: Duration,
    /// Floor on the wait between state polls
    pub min_poll_interval: Duration,
    /// Wait before the first poll after a mutating call
    pub initial_poll_delay: Duration,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            create_timeout: Duration::from_secs(60 * 60),
            delete_timeout: Duration::from_secs(30 * 60),
            restore_timeout: Duration::from_secs(90 * 60),
            min_poll_interval: DEFAULT_POLL_INTERVAL,
            initial_poll_delay: DEFAULT_POLL_DELAY,
        }
    }
}

impl BackupConfig {
    fn poll_config(&self, timeout: Duration) -> PollConfig {
        PollConfig {
            timeout,
            min_interval: self.min_poll_interval,
            initial_delay: self.initial_poll_delay,
        }
    }
}

/// Drives backup creation and deletion against a remote control plane
pub struct BackupManager {
    api: Arc<dyn BackupApi>,
    config: BackupConfig,
}

impl BackupManager {
    /// Create a manager with default deadlines
    pub fn new(api: Arc<dyn BackupApi>) -> Self {
        Self::with_config(api, BackupConfig::default())
    }

    /// Create a manager with custom deadlines
    pub fn with_config(api: Arc<dyn BackupApi>, config: BackupConfig) -> Self {
        Self { api, config }
    }

    /// Trigger a backup and wait for it to reach `Succeeded`.
    ///
    /// A freshly triggered backup may be briefly absent from the control
    /// plane. While it is, the owning cluster decides the classification:
    /// cluster present means the backup is still materializing (keep
    /// waiting); cluster absent means it never will (fail).
    pub async fn create(&self, cluster_id: &str, name: &str) -> Result<Backup> {
        let backup_id = self.api.create_backup(cluster_id, name).await?;
        info!(cluster = %cluster_id, backup = %backup_id, "backup accepted");

        let poller = StatePoller::new(
            "create backup",
            vec![BackupState::Pending, BackupState::Running],
            vec![BackupState::Succeeded, BackupState::Failed],
            self.config.poll_config(self.config.create_timeout),
        );
        let api = Arc::clone(&self.api);
        let cluster_owned = cluster_id.to_string();
        let backup_owned = backup_id.clone();
        let observed = poller
            .poll(move || {
                let api = Arc::clone(&api);
                let cluster_id = cluster_owned.clone();
                let backup_id = backup_owned.clone();
                async move {
                    match api.get_backup(&cluster_id, &backup_id).await? {
                        Some(backup) => {
                            let state = backup.state;
                            Ok(Observed::new(Some(backup), state))
                        }
                        None => match api.get_cluster(&cluster_id).await? {
                            Some(_) => Ok(Observed::new(None, BackupState::Pending)),
                            None => Err(Error::not_found("cluster", cluster_id.as_str())),
                        },
                    }
                }
            })
            .await?;

        match (observed.state, observed.resource) {
            (BackupState::Succeeded, Some(backup)) => Ok(backup),
            (state, resource) => {
                let message = resource
                    .map(|b| b.diagnostic())
                    .unwrap_or_else(|| format!("backup reported state {state}"));
                Err(Error::unexpected_state(
                    "create backup",
                    state.to_string(),
                    message,
                ))
            }
        }
    }

    /// Delete a backup and wait for it to disappear.
    ///
    /// Absence is success: a backup that is already gone satisfies the
    /// delete.
    pub async fn delete(&self, cluster_id: &str, backup_id: &str) -> Result<()> {
        match self.api.delete_backup(cluster_id, backup_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                info!(backup = %backup_id, "backup already absent");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        info!(cluster = %cluster_id, backup = %backup_id, "backup deletion accepted");

        let poller = StatePoller::new(
            "delete backup",
            vec![
                BackupState::Pending,
                BackupState::Running,
                BackupState::Succeeded,
                BackupState::Failed,
            ],
            vec![BackupState::Deleted],
            self.config.poll_config(self.config.delete_timeout),
        );
        let api = Arc::clone(&self.api);
        let cluster_owned = cluster_id.to_string();
        let backup_owned = backup_id.to_string();
        poller
            .poll(move || {
                let api = Arc::clone(&api);
                let cluster_id = cluster_owned.clone();
                let backup_id = backup_owned.clone();
                async move {
                    match api.get_backup(&cluster_id, &backup_id).await? {
                        Some(backup) => {
                            let state = backup.state;
                            Ok(Observed::new(Some(backup), state))
                        }
                        None => Ok(Observed::new(None, BackupState::Deleted)),
                    }
                }
            })
            .await?;

        Ok(())
    }
}

/// Provisions new clusters from existing backups
pub struct RestoreManager {
    api: Arc<dyn RestoreApi>,
    config: BackupConfig,
}

impl RestoreManager {
    /// Create a manager with default deadlines
    pub fn new(api: Arc<dyn RestoreApi>) -> Self {
        Self::with_config(api, BackupConfig::default())
    }

    /// Create a manager with custom deadlines
    pub fn with_config(api: Arc<dyn RestoreApi>, config: BackupConfig) -> Self {
        Self { api, config }
    }

    /// Provision a cluster from a backup and wait for the restore to
    /// reach `Succeeded`.
    pub async fn restore(&self, backup_id: &str, config: &ClusterConfig) -> Result<Restore> {
        config.validate()?;

        let restore_id = self.api.create_restore(backup_id, config).await?;
        info!(backup = %backup_id, restore = %restore_id, "restore accepted");

        let poller = StatePoller::new(
            "restore backup",
            vec![RestoreState::Pending, RestoreState::Running],
            vec![RestoreState::Succeeded, RestoreState::Failed],
            self.config.poll_config(self.config.restore_timeout),
        );
        let api = Arc::clone(&self.api);
        let restore_owned = restore_id.clone();
        let observed = poller
            .poll(move || {
                let api = Arc::clone(&api);
                let restore_id = restore_owned.clone();
                async move {
                    let restore = api
                        .get_restore(&restore_id)
                        .await?
                        .ok_or_else(|| Error::not_found("restore", restore_id.as_str()))?;
                    let state = restore.state;
                    Ok(Observed::new(restore, state))
                }
            })
            .await?;

        if observed.state == RestoreState::Succeeded {
            Ok(observed.resource)
        } else {
            Err(Error::unexpected_state(
                "restore backup",
                observed.state.to_string(),
                observed.resource.diagnostic(),
            ))
        }
    }
}
