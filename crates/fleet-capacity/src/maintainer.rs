//! The periodic spare-capacity maintenance tick.

use log::{info, warn};

use crate::capacity_checker::{CapacityChecker, HostFailurePath};
use crate::capacity_solver::CapacitySolver;
use crate::common::{HostId, Move};
use crate::config::MaintainerConfig;
use crate::deployment::{Deployer, MoveOutcome};
use crate::error::CapacityError;
use crate::fleet::{FleetSnapshot, NodeState, SnapshotProvider};
use crate::host_capacity::HostCapacity;
use crate::metrics::{MetricSink, OVERCOMMITTED_HOSTS, SPARE_HOST_CAPACITY};

const DEPLOY_REASON: &str = "spareCapacityMaintainer";

/// A maintainer which attempts to ensure there is spare capacity available
/// in chunks which can fit all tenant resource configurations in use, such
/// that the fleet is able to quickly replace a failed host if necessary.
///
/// Each tick emits two gauges: the number of overcommitted hosts, and the
/// spare host capacity, i.e. how many hosts the fleet can stand to lose
/// without ending up unable to find a new home for some orphaned tenant.
/// When that capacity reaches zero the maintainer plans the shortest chain
/// of relocations which restores it and dispatches the first of them.
pub struct SpareCapacityMaintainer {
    provider: Box<dyn SnapshotProvider>,
    deployer: Box<dyn Deployer>,
    metric: Box<dyn MetricSink>,
    config: MaintainerConfig,
}

impl SpareCapacityMaintainer {
    pub fn new(
        provider: Box<dyn SnapshotProvider>,
        deployer: Box<dyn Deployer>,
        metric: Box<dyn MetricSink>,
        config: MaintainerConfig,
    ) -> Self {
        Self {
            provider,
            deployer,
            metric,
            config,
        }
    }

    /// The delay the embedder should leave between invocations of
    /// [`tick`](SpareCapacityMaintainer::tick), in seconds.
    pub fn tick_interval(&self) -> f64 {
        self.config.tick_interval
    }

    /// Runs one maintenance pass over a fresh snapshot.
    ///
    /// Nothing is retried within a tick; on error no metrics are emitted and
    /// the next periodic invocation starts over from a new snapshot.
    pub fn tick(&mut self) -> Result<(), CapacityError> {
        if !self.config.allow_host_sharing {
            return Ok(());
        }
        let snapshot = self.provider.snapshot()?;
        let checker = CapacityChecker::new(&snapshot);

        let overcommitted = checker.find_overcommitted_hosts()?;
        if !overcommitted.is_empty() {
            let hostnames: Vec<&str> = overcommitted
                .iter()
                .map(|&host| snapshot.host(host).hostname())
                .collect();
            warn!(
                "{} hosts are overcommitted! [ {} ]",
                overcommitted.len(),
                hostnames.join(", ")
            );
        }
        self.metric.set(OVERCOMMITTED_HOSTS, overcommitted.len() as i64);

        let failure_path = checker.worst_case_host_loss_leading_to_failure()?;
        if let Some(path) = failure_path {
            let mut spare_host_capacity = path.hosts_causing_failure.len() as i64 - 1;
            if spare_host_capacity == 0 {
                let mv = self.find_mitigating_move(&snapshot, &path)?;
                if self.moving(&snapshot, mv) {
                    // We succeeded or are in the process of taking a step to
                    // mitigate. Report with the assumption this will
                    // eventually succeed, to avoid alerting before we're stuck.
                    spare_host_capacity += 1;
                }
            }
            self.metric.set(SPARE_HOST_CAPACITY, spare_host_capacity);
        }
        Ok(())
    }

    fn moving(&mut self, snapshot: &FleetSnapshot, mv: Option<Move>) -> bool {
        let Some(mv) = mv else { return false };
        if snapshot.tenant(mv.tenant).retired() {
            return true; // move already in progress
        }
        match self.deployer.execute_move(&mv, DEPLOY_REASON) {
            MoveOutcome::Done | MoveOutcome::InProgress => true,
            MoveOutcome::Refused => {
                info!(
                    "deployer refused to relocate {} from {} to {}",
                    snapshot.tenant(mv.tenant).hostname(),
                    snapshot.host(mv.from).hostname(),
                    snapshot.host(mv.to).hostname()
                );
                false
            }
        }
    }

    /// Plans the shortest mitigation for the offending tenant of the failure
    /// path and returns its first move, if any exists.
    ///
    /// The two emptiest hosts able to fit the tenant act as spares: the goal
    /// is to make room on one of them, moving tenants only between the
    /// non-spare hosts.
    fn find_mitigating_move(
        &self,
        snapshot: &FleetSnapshot,
        failure_path: &HostFailurePath,
    ) -> Result<Option<Move>, CapacityError> {
        let Some(tenant) = failure_path.offending_tenant else {
            return Ok(None);
        };
        let required = *snapshot.tenant(tenant).resources();
        let capacity = HostCapacity::new(snapshot);

        let active = snapshot.host_ids_in_state(NodeState::Active);
        let eligible: Vec<HostId> = active
            .iter()
            .copied()
            .filter(|&host| snapshot.host(host).resources().satisfies(&required))
            .collect();
        let spare_hosts = capacity.find_spare_hosts(&eligible, 2)?;
        let hosts: Vec<HostId> = active
            .into_iter()
            .filter(|host| !spare_hosts.contains(host))
            .collect();

        let mut shortest: Option<Vec<Move>> = None;
        for &spare in &spare_hosts {
            let mut solver = CapacitySolver::new(&capacity, &self.config);
            let Some(mitigation) = solver.make_room_for(tenant, spare, &hosts, &[], &[])? else {
                continue;
            };
            if shortest.as_ref().map_or(true, |s| s.len() > mitigation.len()) {
                shortest = Some(mitigation);
            }
        }
        Ok(shortest.and_then(|moves| moves.first().copied()))
    }
}
