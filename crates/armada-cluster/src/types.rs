//! Core types for managed clusters and their worker fleets

use std::fmt;

use serde::{Deserialize, Serialize};

use armada_common::Error;

/// The (instance type, disk size) pair identifying a class of worker
/// nodes, independent of how many are requested.
///
/// Shapes are compared by exact field equality and used directly as map
/// keys; no normalization (such as case folding) is performed.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct NodeShape {
    /// Control-plane instance type identifier (e.g. "m5.xlarge")
    pub instance_type: String,
    /// Node disk size in GiB
    pub disk_gib: u32,
}

impl NodeShape {
    /// Create a node shape
    pub fn new(instance_type: impl Into<String>, disk_gib: u32) -> Self {
        Self {
            instance_type: instance_type.into(),
            disk_gib,
        }
    }
}

impl fmt::Display for NodeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}GiB", self.instance_type, self.disk_gib)
    }
}

/// A node shape plus a worker count.
///
/// A count of 0 is never persisted as a group; it collapses to absence.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerGroup {
    /// The shape shared by every node in the group
    #[serde(flatten)]
    pub shape: NodeShape,
    /// Number of nodes of this shape
    pub count: u32,
}

impl WorkerGroup {
    /// Create a worker group
    pub fn new(shape: NodeShape, count: u32) -> Self {
        Self { shape, count }
    }
}

impl fmt::Display for WorkerGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.count, self.shape)
    }
}

/// The incremental operations moving an observed worker fleet to a
/// desired one.
///
/// Both lists contain only groups with `count > 0`, and a given shape
/// never appears in both: a shape's delta is net, either growing or
/// shrinking.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerSetDelta {
    /// Groups to add, keyed by shape with the count to add
    pub to_add: Vec<WorkerGroup>,
    /// Groups to remove, keyed by shape with the count to remove
    pub to_remove: Vec<WorkerGroup>,
}

impl WorkerSetDelta {
    /// Returns true when observed already matches desired
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

impl fmt::Display for WorkerSetDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let add: Vec<String> = self.to_add.iter().map(|g| format!("+{g}")).collect();
        let remove: Vec<String> = self.to_remove.iter().map(|g| format!("-{g}")).collect();
        write!(f, "[{}]", add.into_iter().chain(remove).collect::<Vec<_>>().join(", "))
    }
}

/// Cluster lifecycle state as reported by the control plane
///
/// `Deleted` is synthetic: the control plane never reports it, the delete
/// operation maps resource absence onto it.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterState {
    /// Cluster infrastructure is being provisioned
    #[default]
    Creating,
    /// Cluster is serving and can be mutated
    Running,
    /// Worker fleet is being resized
    Scaling,
    /// Component version rollout in progress
    Upgrading,
    /// Cluster is being paused
    Stopping,
    /// Cluster is paused; compute released, storage retained
    Stopped,
    /// Cluster is resuming from a pause
    Starting,
    /// Cluster is being torn down
    Deleting,
    /// Cluster hit an unrecoverable error
    Failed,
    /// Synthetic: the cluster no longer exists
    Deleted,
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creating => write!(f, "CREATING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Scaling => write!(f, "SCALING"),
            Self::Upgrading => write!(f, "UPGRADING"),
            Self::Stopping => write!(f, "STOPPING"),
            Self::Stopped => write!(f, "STOPPED"),
            Self::Starting => write!(f, "STARTING"),
            Self::Deleting => write!(f, "DELETING"),
            Self::Failed => write!(f, "FAILED"),
            Self::Deleted => write!(f, "DELETED"),
        }
    }
}

/// A managed cluster as observed from the control plane
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Control-plane identifier
    pub id: String,
    /// User-facing cluster name
    pub name: String,
    /// Current lifecycle state
    pub state: ClusterState,
    /// Diagnostic message attached by the control plane, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Observed worker fleet configuration
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub worker_groups: Vec<WorkerGroup>,
    /// Deployed component version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Cluster {
    /// The diagnostic message, or a generic description of the state
    pub fn diagnostic(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("cluster reported state {}", self.state))
    }
}

/// Desired configuration for creating a cluster
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// User-facing cluster name
    pub name: String,
    /// Component version to deploy
    pub version: String,
    /// Worker fleet to provision
    pub worker_groups: Vec<WorkerGroup>,
}

impl ClusterConfig {
    /// Validate the configuration locally, before any remote call
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::precondition("cluster", "name must not be empty"));
        }
        if self.version.is_empty() {
            return Err(Error::precondition(
                format!("cluster {}", self.name),
                "version must not be empty",
            ));
        }
        for group in &self.worker_groups {
            if group.count == 0 {
                return Err(Error::precondition(
                    format!("cluster {}", self.name),
                    format!("worker group {} has count 0; omit the group instead", group.shape),
                ));
            }
        }
        Ok(())
    }
}
