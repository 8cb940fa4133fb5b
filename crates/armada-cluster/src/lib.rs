//! Cluster lifecycle management for Armada
//!
//! This crate drives remote managed clusters through their lifecycle:
//! create, scale, stop/start, upgrade, and delete. Scaling is computed by
//! a pure worker-set reconciler; every mutating operation is followed by a
//! state poll to quiescence.

#![deny(missing_docs)]

pub mod api;
pub mod lifecycle;
pub mod reconcile;
pub mod types;

pub use api::ClusterApi;
pub use lifecycle::{ClusterManager, LifecycleConfig};
pub use reconcile::reconcile;
pub use types::{Cluster, ClusterConfig, ClusterState, NodeShape, WorkerGroup, WorkerSetDelta};
