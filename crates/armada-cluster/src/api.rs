//! Remote control-plane accessor for managed clusters
//!
//! This trait is the seam between the lifecycle engine and the wire: the
//! real implementation wraps the control plane's HTTP surface, while
//! tests substitute a mock.

use async_trait::async_trait;

use armada_common::Result;

use crate::types::{Cluster, ClusterConfig, WorkerGroup};

#[cfg(test)]
use mockall::automock;

/// Remote accessor for managed-cluster resources
///
/// Every call is one remote round trip. `get_cluster` returns `Ok(None)`
/// as the typed not-found signal; mutating calls surface
/// [`armada_common::Error::NotFound`] when their target is absent.
/// Transport retry policy belongs to the implementation, not the
/// lifecycle layer.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Create a cluster, returning its control-plane identifier
    ///
    /// Returns as soon as the control plane accepts the request; the
    /// cluster provisions asynchronously.
    async fn create_cluster(&self, config: &ClusterConfig) -> Result<String>;

    /// Fetch a cluster's current record, or `None` if it does not exist
    async fn get_cluster(&self, id: &str) -> Result<Option<Cluster>>;

    /// Request deletion of a cluster
    async fn delete_cluster(&self, id: &str) -> Result<()>;

    /// Pause a running cluster, releasing compute but retaining storage
    async fn pause_cluster(&self, id: &str) -> Result<()>;

    /// Resume a paused cluster
    async fn resume_cluster(&self, id: &str) -> Result<()>;

    /// Change the cluster's component version, starting a rolling upgrade
    async fn set_version(&self, id: &str, version: &str) -> Result<()>;

    /// Add `group.count` workers of `group.shape` to the cluster
    async fn add_workers(&self, id: &str, group: &WorkerGroup) -> Result<()>;

    /// Remove `group.count` workers of `group.shape` from the cluster
    async fn remove_workers(&self, id: &str, group: &WorkerGroup) -> Result<()>;
}
