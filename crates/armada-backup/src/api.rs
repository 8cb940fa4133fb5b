//! Remote control-plane accessors for backups and restores

use async_trait::async_trait;

use armada_cluster::types::{Cluster, ClusterConfig};
use armada_common::Result;

use crate::types::{Backup, Restore};

#[cfg(test)]
use mockall::automock;

/// Remote accessor for backup resources
///
/// `get_backup` returns `Ok(None)` as the typed not-found signal. The
/// owning-cluster lookup exists because a freshly triggered backup may
/// not be visible yet: the lifecycle layer consults the cluster to tell
/// "not yet created" apart from "will never appear".
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BackupApi: Send + Sync {
    /// Trigger a backup of a cluster, returning the backup's identifier
    async fn create_backup(&self, cluster_id: &str, name: &str) -> Result<String>;

    /// Fetch a backup's current record, or `None` if it does not exist
    async fn get_backup(&self, cluster_id: &str, backup_id: &str) -> Result<Option<Backup>>;

    /// Request deletion of a backup
    async fn delete_backup(&self, cluster_id: &str, backup_id: &str) -> Result<()>;

    /// Fetch the owning cluster, or `None` if it does not exist
    async fn get_cluster(&self, cluster_id: &str) -> Result<Option<Cluster>>;
}

/// Remote accessor for restore resources
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RestoreApi: Send + Sync {
    /// Provision a new cluster from a backup, returning the restore's
    /// identifier
    async fn create_restore(&self, backup_id: &str, config: &ClusterConfig) -> Result<String>;

    /// Fetch a restore's current record, or `None` if it does not exist
    async fn get_restore(&self, restore_id: &str) -> Result<Option<Restore>>;
}
