//! Worst-case host-loss analysis over a fleet snapshot.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::common::{HostId, TenantId};
use crate::error::CapacityError;
use crate::fleet::{FleetSnapshot, NodeState};
use crate::host_capacity::HostCapacity;
use crate::resources::Resources;

/// The sequence of hosts whose successive loss first produces a tenant with
/// no new home, and that tenant. The sequence length reads as `slack + 1`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HostFailurePath {
    pub hosts_causing_failure: Vec<HostId>,
    pub offending_tenant: Option<TenantId>,
}

/// Analyses how many hosts the fleet can lose before some orphaned tenant
/// becomes unplaceable, and which hosts are overcommitted.
pub struct CapacityChecker<'a> {
    snapshot: &'a FleetSnapshot,
    capacity: HostCapacity<'a>,
}

impl<'a> CapacityChecker<'a> {
    pub fn new(snapshot: &'a FleetSnapshot) -> Self {
        Self {
            snapshot,
            capacity: HostCapacity::new(snapshot),
        }
    }

    /// All hosts whose children's summed resources exceed the host's own
    /// envelope on some scalar axis, in hostname order.
    pub fn find_overcommitted_hosts(&self) -> Result<Vec<HostId>, CapacityError> {
        let mut overcommitted = Vec::new();
        for host in self.snapshot.host_ids() {
            let allocated = self.capacity.allocated_on(host)?;
            if allocated.exceeds_any_of(self.snapshot.host(host).resources()) {
                overcommitted.push(host);
            }
        }
        Ok(overcommitted)
    }

    /// The shortest sequence of host losses which strands some tenant,
    /// across all choices of the first host to lose. `None` means the fleet
    /// can withstand the loss of every host.
    pub fn worst_case_host_loss_leading_to_failure(
        &self,
    ) -> Result<Option<HostFailurePath>, CapacityError> {
        let mut starting_hosts = Vec::new();
        for host in self.snapshot.host_ids_in_state(NodeState::Active) {
            starting_hosts.push((host, self.capacity.free_capacity_of(host)?));
        }
        // most free capacity first: the damage such a loss does is hardest to absorb
        starting_hosts.sort_by(|(a, free_a), (b, free_b)| {
            free_b
                .cmp_size(free_a)
                .then_with(|| self.snapshot.host(*a).hostname().cmp(self.snapshot.host(*b).hostname()))
        });

        let mut shortest: Option<HostFailurePath> = None;
        for (host, _) in starting_hosts {
            let Some(path) = self.failure_path_starting_at(host)? else { continue };
            if shortest
                .as_ref()
                .map_or(true, |s| path.hosts_causing_failure.len() < s.hosts_causing_failure.len())
            {
                let minimal = path.hosts_causing_failure.len() == 1;
                shortest = Some(path);
                if minimal {
                    break;
                }
            }
        }
        Ok(shortest)
    }

    /// Simulates losing the given host first, then repeatedly the most
    /// damaging remaining host, reassigning orphans greedily, until some
    /// orphan cannot be placed or the fleet runs out of hosts.
    fn failure_path_starting_at(
        &self,
        first: HostId,
    ) -> Result<Option<HostFailurePath>, CapacityError> {
        let mut fleet = SimulatedFleet::over(&self.capacity)?;
        let mut path = Vec::new();
        let mut next = first;
        loop {
            path.push(next);
            let orphans = fleet.remove_host(next, self.snapshot);
            for orphan in orphans {
                if fleet.place(orphan, self.snapshot)?.is_none() {
                    return Ok(Some(HostFailurePath {
                        hosts_causing_failure: path,
                        offending_tenant: Some(orphan),
                    }));
                }
            }
            match fleet.most_damaging_host(self.snapshot)? {
                Some(host) => next = host,
                None => return Ok(None),
            }
        }
    }
}

/// Mutable placement state used while simulating a chain of host losses.
struct SimulatedFleet {
    free: BTreeMap<HostId, Resources>,
    tenants_on: BTreeMap<HostId, Vec<TenantId>>,
}

impl SimulatedFleet {
    fn over(capacity: &HostCapacity) -> Result<Self, CapacityError> {
        let snapshot = capacity.snapshot();
        let mut free = BTreeMap::new();
        let mut tenants_on = BTreeMap::new();
        for host in snapshot.host_ids_in_state(NodeState::Active) {
            free.insert(host, capacity.free_capacity_of(host)?);
            tenants_on.insert(host, snapshot.children_of(host).to_vec());
        }
        Ok(Self { free, tenants_on })
    }

    /// Drops the host from the simulation, returning its tenants ordered by
    /// descending size, then hostname.
    fn remove_host(&mut self, host: HostId, snapshot: &FleetSnapshot) -> Vec<TenantId> {
        self.free.remove(&host);
        let mut orphans = self.tenants_on.remove(&host).unwrap_or_default();
        orphans.sort_by(|a, b| {
            let (a, b) = (snapshot.tenant(*a), snapshot.tenant(*b));
            b.resources()
                .cmp_size(a.resources())
                .then_with(|| a.hostname().cmp(b.hostname()))
        });
        orphans
    }

    /// Places the tenant on the remaining host with the greatest free
    /// capacity that satisfies it, ties by hostname. Returns the chosen
    /// host, or `None` when no host fits.
    fn place(
        &mut self,
        tenant: TenantId,
        snapshot: &FleetSnapshot,
    ) -> Result<Option<HostId>, CapacityError> {
        let required = snapshot.tenant(tenant).resources();
        let mut best: Option<(HostId, Resources)> = None;
        for (&host, free) in self.free.iter() {
            if !free.satisfies(required) {
                continue;
            }
            let better = match &best {
                None => true,
                Some((best_host, best_free)) => match free.cmp_size(best_free) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => {
                        snapshot.host(host).hostname() < snapshot.host(*best_host).hostname()
                    }
                },
            };
            if better {
                best = Some((host, *free));
            }
        }
        let Some((host, free)) = best else { return Ok(None) };
        self.free.insert(host, free.subtract(required)?);
        if let Some(list) = self.tenants_on.get_mut(&host) {
            list.push(tenant);
        }
        Ok(Some(host))
    }

    /// The remaining host whose loss would strand the most tenants, ties by
    /// descending total tenant size, then hostname. `None` when no hosts
    /// remain.
    fn most_damaging_host(
        &self,
        snapshot: &FleetSnapshot,
    ) -> Result<Option<HostId>, CapacityError> {
        let mut best: Option<(HostId, usize, Resources)> = None;
        for (&host, tenants) in self.tenants_on.iter() {
            let mut unplaceable = 0;
            let mut total = Resources::zero();
            for &tenant in tenants {
                let required = snapshot.tenant(tenant).resources();
                total = total.add(required)?;
                let placeable = self
                    .free
                    .iter()
                    .any(|(&other, free)| other != host && free.satisfies(required));
                if !placeable {
                    unplaceable += 1;
                }
            }
            let better = match &best {
                None => true,
                Some((best_host, best_count, best_total)) => {
                    if unplaceable != *best_count {
                        unplaceable > *best_count
                    } else {
                        match total.cmp_size(best_total) {
                            Ordering::Greater => true,
                            Ordering::Less => false,
                            Ordering::Equal => {
                                snapshot.host(host).hostname() < snapshot.host(*best_host).hostname()
                            }
                        }
                    }
                }
            };
            if better {
                best = Some((host, unplaceable, total));
            }
        }
        Ok(best.map(|(host, _, _)| host))
    }
}
