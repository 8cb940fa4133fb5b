//! Cluster lifecycle operations
//!
//! Each operation is a fixed sequence: local precondition checks, one or
//! more mutating calls to the control plane, a state poll to quiescence,
//! and a comparison of the final observed state against the operation's
//! single expected success state. Preconditions never trigger a remote
//! call; terminal mismatches surface the cluster's diagnostic message.
//!
//! Operations on different cluster ids may run concurrently; the caller
//! serializes operations on the same id.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use armada_common::poll::{Observed, PollConfig, StatePoller};
use armada_common::{Error, Result, DEFAULT_POLL_DELAY, DEFAULT_POLL_INTERVAL};

use crate::api::ClusterApi;
use crate::reconcile::reconcile;
use crate::types::{Cluster, ClusterConfig, ClusterState, WorkerGroup};

/// Per-operation deadlines and poll pacing
///
/// Create gets the longest deadline: initial provisioning is the slowest
/// control-plane operation by a wide margin.
#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    /// Deadline for initial provisioning
    pub create_timeout: Duration,
    /// Deadline for each scale step to settle
    pub scale_timeout: Duration,
    /// Deadline for a pause to complete
    pub stop_timeout: Duration,
    /// Deadline for a resume to complete
    pub start_timeout: Duration,
    /// Deadline for a version rollout
    pub upgrade_timeout: Duration,
    /// Deadline for teardown
    pub delete_timeout: Duration,
    /// Floor on the wait between state polls
    pub min_poll_interval: Duration,
    /// Wait before the first poll after a mutating call
    pub initial_poll_delay: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            create_timeout: Duration::from_secs(90 * 60),
            scale_timeout: Duration::from_secs(60 * 60),
            stop_timeout: Duration::from_secs(30 * 60),
            start_timeout: Duration::from_secs(30 * 60),
            upgrade_timeout: Duration::from_secs(60 * 60),
            delete_timeout: Duration::from_secs(30 * 60),
            min_poll_interval: DEFAULT_POLL_INTERVAL,
            initial_poll_delay: DEFAULT_POLL_DELAY,
        }
    }
}

impl LifecycleConfig {
    fn poll_config(&self, timeout: Duration) -> PollConfig {
        PollConfig {
            timeout,
            min_interval: self.min_poll_interval,
            initial_delay: self.initial_poll_delay,
        }
    }
}

/// Drives managed clusters through their lifecycle against a remote
/// control plane.
///
/// Owns no persistent state; every operation reads fresh remote state.
pub struct ClusterManager {
    api: Arc<dyn ClusterApi>,
    config: LifecycleConfig,
}

impl ClusterManager {
    /// Create a manager with default deadlines
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self::with_config(api, LifecycleConfig::default())
    }

    /// Create a manager with custom deadlines
    pub fn with_config(api: Arc<dyn ClusterApi>, config: LifecycleConfig) -> Self {
        Self { api, config }
    }

    /// Create a cluster and wait for it to reach `Running`.
    pub async fn create(&self, config: &ClusterConfig) -> Result<Cluster> {
        config.validate()?;

        let id = self.api.create_cluster(config).await?;
        info!(cluster = %id, name = %config.name, "cluster creation accepted");

        let observed = self
            .poll_cluster(
                "create cluster",
                &id,
                vec![ClusterState::Creating],
                self.config.create_timeout,
            )
            .await?;
        expect_state("create cluster", observed, ClusterState::Running)
    }

    /// Move the worker fleet to `desired`, waiting for each step to settle.
    ///
    /// Removals precede additions, so the fleet dips below the desired
    /// capacity during the transition rather than exceeding it.
    pub async fn scale(&self, id: &str, desired: &[WorkerGroup]) -> Result<Cluster> {
        let cluster = self.require_cluster(id).await?;
        if cluster.state != ClusterState::Running {
            return Err(Error::precondition(
                format!("cluster {id}"),
                format!("cannot scale a cluster in state {}", cluster.state),
            ));
        }

        let delta = reconcile(&cluster.worker_groups, desired);
        if delta.is_empty() {
            debug!(cluster = %id, "worker set already at desired configuration");
            return Ok(cluster);
        }
        info!(cluster = %id, delta = %delta, "scaling worker set");

        let mut latest = cluster;
        for group in &delta.to_remove {
            self.api.remove_workers(id, group).await?;
            let observed = self
                .poll_cluster(
                    "scale cluster",
                    id,
                    vec![ClusterState::Scaling],
                    self.config.scale_timeout,
                )
                .await?;
            latest = expect_state("scale cluster", observed, ClusterState::Running)?;
        }
        for group in &delta.to_add {
            self.api.add_workers(id, group).await?;
            let observed = self
                .poll_cluster(
                    "scale cluster",
                    id,
                    vec![ClusterState::Scaling],
                    self.config.scale_timeout,
                )
                .await?;
            latest = expect_state("scale cluster", observed, ClusterState::Running)?;
        }

        info!(cluster = %id, "worker set scaled to desired configuration");
        Ok(latest)
    }

    /// Pause a running cluster and wait for it to reach `Stopped`.
    pub async fn stop(&self, id: &str) -> Result<Cluster> {
        let cluster = self.require_cluster(id).await?;
        if cluster.state != ClusterState::Running {
            return Err(Error::precondition(
                format!("cluster {id}"),
                format!("cannot stop a cluster in state {}", cluster.state),
            ));
        }

        self.api.pause_cluster(id).await?;
        info!(cluster = %id, "cluster pause accepted");

        let observed = self
            .poll_cluster(
                "stop cluster",
                id,
                vec![ClusterState::Running, ClusterState::Stopping],
                self.config.stop_timeout,
            )
            .await?;
        expect_state("stop cluster", observed, ClusterState::Stopped)
    }

    /// Resume a paused cluster and wait for it to reach `Running`.
    pub async fn start(&self, id: &str) -> Result<Cluster> {
        let cluster = self.require_cluster(id).await?;
        if cluster.state != ClusterState::Stopped {
            return Err(Error::precondition(
                format!("cluster {id}"),
                format!("cannot start a cluster in state {}", cluster.state),
            ));
        }

        self.api.resume_cluster(id).await?;
        info!(cluster = %id, "cluster resume accepted");

        let observed = self
            .poll_cluster(
                "start cluster",
                id,
                vec![ClusterState::Stopped, ClusterState::Starting],
                self.config.start_timeout,
            )
            .await?;
        expect_state("start cluster", observed, ClusterState::Running)
    }

    /// Roll the cluster to `version` and wait for it to return to
    /// `Running`. Requesting the already-deployed version is a no-op.
    pub async fn upgrade(&self, id: &str, version: &str) -> Result<Cluster> {
        let cluster = self.require_cluster(id).await?;
        if cluster.version.as_deref() == Some(version) {
            debug!(cluster = %id, version, "cluster already at requested version");
            return Ok(cluster);
        }
        if cluster.state != ClusterState::Running {
            return Err(Error::precondition(
                format!("cluster {id}"),
                format!("cannot upgrade a cluster in state {}", cluster.state),
            ));
        }

        self.api.set_version(id, version).await?;
        info!(cluster = %id, version, "cluster upgrade accepted");

        let observed = self
            .poll_cluster(
                "upgrade cluster",
                id,
                vec![ClusterState::Upgrading],
                self.config.upgrade_timeout,
            )
            .await?;
        expect_state("upgrade cluster", observed, ClusterState::Running)
    }

    /// Delete a cluster and wait for it to disappear.
    ///
    /// Absence is success: a cluster that is already gone, or that
    /// vanishes while polling, satisfies the delete.
    pub async fn delete(&self, id: &str) -> Result<()> {
        match self.api.delete_cluster(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                info!(cluster = %id, "cluster already absent");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        info!(cluster = %id, "cluster deletion accepted");

        let poller = StatePoller::new(
            "delete cluster",
            vec![ClusterState::Deleting],
            vec![ClusterState::Deleted, ClusterState::Failed],
            self.config.poll_config(self.config.delete_timeout),
        );
        let api = Arc::clone(&self.api);
        let id_owned = id.to_string();
        let observed = poller
            .poll(move || {
                let api = Arc::clone(&api);
                let id = id_owned.clone();
                async move {
                    // Not-found is the terminal we are waiting for.
                    match api.get_cluster(&id).await? {
                        Some(cluster) => {
                            let state = cluster.state;
                            Ok(Observed::new(Some(cluster), state))
                        }
                        None => Ok(Observed::new(None, ClusterState::Deleted)),
                    }
                }
            })
            .await?;

        match observed.state {
            ClusterState::Deleted => Ok(()),
            state => {
                let message = observed
                    .resource
                    .map(|c| c.diagnostic())
                    .unwrap_or_else(|| format!("cluster reported state {state}"));
                Err(Error::unexpected_state(
                    "delete cluster",
                    state.to_string(),
                    message,
                ))
            }
        }
    }

    /// Fetch a cluster that must exist
    async fn require_cluster(&self, id: &str) -> Result<Cluster> {
        self.api
            .get_cluster(id)
            .await?
            .ok_or_else(|| Error::not_found("cluster", id))
    }

    /// Poll a cluster to any terminal state.
    ///
    /// `Running`, `Stopped`, and `Failed` are terminal for every
    /// operation; `pending` names the states the operation expects to
    /// pass through. The caller interprets the terminal state reached.
    async fn poll_cluster(
        &self,
        operation: &str,
        id: &str,
        pending: Vec<ClusterState>,
        timeout: Duration,
    ) -> Result<Observed<Cluster, ClusterState>> {
        let poller = StatePoller::new(
            operation,
            pending,
            vec![
                ClusterState::Running,
                ClusterState::Stopped,
                ClusterState::Failed,
            ],
            self.config.poll_config(timeout),
        );
        let api = Arc::clone(&self.api);
        let id_owned = id.to_string();
        poller
            .poll(move || {
                let api = Arc::clone(&api);
                let id = id_owned.clone();
                async move {
                    let cluster = api
                        .get_cluster(&id)
                        .await?
                        .ok_or_else(|| Error::not_found("cluster", id.as_str()))?;
                    let state = cluster.state;
                    Ok(Observed::new(cluster, state))
                }
            })
            .await
    }
}

/// Compare the terminal state reached against the operation's expected
/// success state, surfacing the cluster's diagnostic on mismatch.
fn expect_state(
    operation: &str,
    observed: Observed<Cluster, ClusterState>,
    want: ClusterState,
) -> Result<Cluster> {
    if observed.state == want {
        Ok(observed.resource)
    } else {
        Err(Error::unexpected_state(
            operation,
            observed.state.to_string(),
            observed.resource.diagnostic(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockClusterApi;
    use crate::types::NodeShape;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn group(instance_type: &str, disk_gib: u32, count: u32) -> WorkerGroup {
        WorkerGroup::new(NodeShape::new(instance_type, disk_gib), count)
    }

    fn sample_config() -> ClusterConfig {
        ClusterConfig {
            name: "analytics-prod".to_string(),
            version: "7.1.3".to_string(),
            worker_groups: vec![group("m5.xlarge", 512, 3)],
        }
    }

    fn cluster_in(state: ClusterState) -> Cluster {
        Cluster {
            id: "c-1".to_string(),
            name: "analytics-prod".to_string(),
            state,
            message: None,
            worker_groups: vec![group("m5.xlarge", 512, 3)],
            version: Some("7.1.3".to_string()),
        }
    }

    /// get_cluster stub walking through a fixed state sequence, holding
    /// the final entry once the sequence is exhausted. `None` entries
    /// model resource absence.
    fn scripted_get(api: &mut MockClusterApi, states: Vec<Option<ClusterState>>) {
        let calls = AtomicU32::new(0);
        api.expect_get_cluster().returning(move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst) as usize;
            let entry = states[n.min(states.len() - 1)];
            Ok(entry.map(cluster_in))
        });
    }

    fn manager(api: MockClusterApi) -> ClusterManager {
        ClusterManager::new(Arc::new(api))
    }

    mod create {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_create_polls_to_running() {
            let mut api = MockClusterApi::new();
            api.expect_create_cluster()
                .times(1)
                .returning(|_| Ok("c-1".to_string()));
            scripted_get(
                &mut api,
                vec![
                    Some(ClusterState::Creating),
                    Some(ClusterState::Creating),
                    Some(ClusterState::Running),
                ],
            );

            let cluster = manager(api).create(&sample_config()).await.unwrap();
            assert_eq!(cluster.state, ClusterState::Running);
        }

        #[tokio::test(start_paused = true)]
        async fn test_create_surfaces_failure_diagnostic() {
            let mut api = MockClusterApi::new();
            api.expect_create_cluster()
                .times(1)
                .returning(|_| Ok("c-1".to_string()));
            api.expect_get_cluster().returning(|_| {
                let mut cluster = cluster_in(ClusterState::Failed);
                cluster.message = Some("insufficient quota".to_string());
                Ok(Some(cluster))
            });

            let err = manager(api).create(&sample_config()).await.unwrap_err();
            match err {
                Error::UnexpectedState { state, message, .. } => {
                    assert_eq!(state, "FAILED");
                    assert_eq!(message, "insufficient quota");
                }
                other => panic!("expected UnexpectedState, got {other}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_invalid_config_never_reaches_remote() {
            // No expectations set: any remote call would panic the mock
            let api = MockClusterApi::new();

            let mut config = sample_config();
            config.name = String::new();

            let err = manager(api).create(&config).await.unwrap_err();
            assert!(matches!(err, Error::Precondition { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_create_times_out_with_last_state() {
            let mut api = MockClusterApi::new();
            api.expect_create_cluster()
                .times(1)
                .returning(|_| Ok("c-1".to_string()));
            scripted_get(&mut api, vec![Some(ClusterState::Creating)]);

            let config = LifecycleConfig {
                create_timeout: Duration::from_secs(75),
                ..Default::default()
            };
            let manager = ClusterManager::with_config(Arc::new(api), config);

            let err = manager.create(&sample_config()).await.unwrap_err();
            match err {
                Error::Timeout { last_state, .. } => assert_eq!(last_state, "CREATING"),
                other => panic!("expected Timeout, got {other}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_refresh_error_aborts_poll() {
            let mut api = MockClusterApi::new();
            api.expect_create_cluster()
                .times(1)
                .returning(|_| Ok("c-1".to_string()));
            api.expect_get_cluster()
                .times(1)
                .returning(|_| Err(Error::remote_with_code(502, "bad gateway")));

            let err = manager(api).create(&sample_config()).await.unwrap_err();
            assert!(matches!(err, Error::Remote { code: Some(502), .. }));
        }
    }

    mod scale {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_noop_when_already_at_desired() {
            let mut api = MockClusterApi::new();
            scripted_get(&mut api, vec![Some(ClusterState::Running)]);
            // No add/remove expectations: any mutation would panic

            let cluster = manager(api)
                .scale("c-1", &[group("m5.xlarge", 512, 3)])
                .await
                .unwrap();
            assert_eq!(cluster.state, ClusterState::Running);
        }

        #[tokio::test(start_paused = true)]
        async fn test_removals_precede_additions() {
            let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

            let mut api = MockClusterApi::new();
            scripted_get(&mut api, vec![Some(ClusterState::Running)]);

            let log = Arc::clone(&order);
            api.expect_remove_workers()
                .times(1)
                .returning(move |_, group| {
                    log.lock().unwrap().push(format!("remove {group}"));
                    Ok(())
                });
            let log = Arc::clone(&order);
            api.expect_add_workers()
                .times(1)
                .returning(move |_, group| {
                    log.lock().unwrap().push(format!("add {group}"));
                    Ok(())
                });

            // Observed: 3x m5.xlarge/512. Desired: 1x m5.xlarge/512 + 2x c6g.large/256
            manager(api)
                .scale(
                    "c-1",
                    &[group("m5.xlarge", 512, 1), group("c6g.large", 256, 2)],
                )
                .await
                .unwrap();

            let order = order.lock().unwrap();
            assert_eq!(
                *order,
                vec![
                    "remove 2x m5.xlarge/512GiB".to_string(),
                    "add 2x c6g.large/256GiB".to_string(),
                ]
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_scale_waits_for_each_step() {
            let mut api = MockClusterApi::new();
            // require_cluster, then poll after the removal: Scaling, Running
            scripted_get(
                &mut api,
                vec![
                    Some(ClusterState::Running),
                    Some(ClusterState::Scaling),
                    Some(ClusterState::Running),
                ],
            );
            api.expect_remove_workers().times(1).returning(|_, _| Ok(()));

            let cluster = manager(api).scale("c-1", &[]).await.unwrap();
            assert_eq!(cluster.state, ClusterState::Running);
        }

        #[tokio::test(start_paused = true)]
        async fn test_stopped_cluster_cannot_scale() {
            let mut api = MockClusterApi::new();
            scripted_get(&mut api, vec![Some(ClusterState::Stopped)]);

            let err = manager(api).scale("c-1", &[]).await.unwrap_err();
            match err {
                Error::Precondition { message, .. } => {
                    assert!(message.contains("STOPPED"));
                }
                other => panic!("expected Precondition, got {other}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_absent_cluster_is_not_found() {
            let mut api = MockClusterApi::new();
            scripted_get(&mut api, vec![None]);

            let err = manager(api).scale("c-1", &[]).await.unwrap_err();
            assert!(err.is_not_found());
        }
    }

    mod stop_start {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_stop_polls_to_stopped() {
            let mut api = MockClusterApi::new();
            scripted_get(
                &mut api,
                vec![
                    Some(ClusterState::Running),
                    Some(ClusterState::Stopping),
                    Some(ClusterState::Stopped),
                ],
            );
            api.expect_pause_cluster().times(1).returning(|_| Ok(()));

            let cluster = manager(api).stop("c-1").await.unwrap();
            assert_eq!(cluster.state, ClusterState::Stopped);
        }

        #[tokio::test(start_paused = true)]
        async fn test_stop_rejects_already_stopped() {
            let mut api = MockClusterApi::new();
            scripted_get(&mut api, vec![Some(ClusterState::Stopped)]);
            // pause_cluster must never be called

            let err = manager(api).stop("c-1").await.unwrap_err();
            assert!(matches!(err, Error::Precondition { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_start_polls_to_running() {
            let mut api = MockClusterApi::new();
            scripted_get(
                &mut api,
                vec![
                    Some(ClusterState::Stopped),
                    Some(ClusterState::Starting),
                    Some(ClusterState::Running),
                ],
            );
            api.expect_resume_cluster().times(1).returning(|_| Ok(()));

            let cluster = manager(api).start("c-1").await.unwrap();
            assert_eq!(cluster.state, ClusterState::Running);
        }

        #[tokio::test(start_paused = true)]
        async fn test_start_rejects_running_cluster() {
            let mut api = MockClusterApi::new();
            scripted_get(&mut api, vec![Some(ClusterState::Running)]);

            let err = manager(api).start("c-1").await.unwrap_err();
            assert!(matches!(err, Error::Precondition { .. }));
        }
    }

    mod upgrade {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_upgrade_polls_to_running() {
            let mut api = MockClusterApi::new();
            scripted_get(
                &mut api,
                vec![
                    Some(ClusterState::Running),
                    Some(ClusterState::Upgrading),
                    Some(ClusterState::Running),
                ],
            );
            api.expect_set_version()
                .times(1)
                .withf(|_, version| version == "7.2.0")
                .returning(|_, _| Ok(()));

            let cluster = manager(api).upgrade("c-1", "7.2.0").await.unwrap();
            assert_eq!(cluster.state, ClusterState::Running);
        }

        #[tokio::test(start_paused = true)]
        async fn test_upgrade_to_current_version_is_noop() {
            let mut api = MockClusterApi::new();
            scripted_get(&mut api, vec![Some(ClusterState::Running)]);
            // set_version must never be called

            let cluster = manager(api).upgrade("c-1", "7.1.3").await.unwrap();
            assert_eq!(cluster.version.as_deref(), Some("7.1.3"));
        }
    }

    mod delete {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_delete_treats_absence_as_success() {
            let mut api = MockClusterApi::new();
            api.expect_delete_cluster().times(1).returning(|_| Ok(()));
            scripted_get(&mut api, vec![Some(ClusterState::Deleting), None]);

            manager(api).delete("c-1").await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_delete_of_absent_cluster_succeeds_without_poll() {
            let mut api = MockClusterApi::new();
            api.expect_delete_cluster()
                .times(1)
                .returning(|_| Err(Error::not_found("cluster", "c-1")));
            // get_cluster must never be called

            manager(api).delete("c-1").await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_delete_surfaces_failed_teardown() {
            let mut api = MockClusterApi::new();
            api.expect_delete_cluster().times(1).returning(|_| Ok(()));
            api.expect_get_cluster().returning(|_| {
                let mut cluster = cluster_in(ClusterState::Failed);
                cluster.message = Some("detaching volumes failed".to_string());
                Ok(Some(cluster))
            });

            let err = manager(api).delete("c-1").await.unwrap_err();
            match err {
                Error::UnexpectedState { state, message, .. } => {
                    assert_eq!(state, "FAILED");
                    assert_eq!(message, "detaching volumes failed");
                }
                other => panic!("expected UnexpectedState, got {other}"),
            }
        }
    }
}
