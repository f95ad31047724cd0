//! Free-capacity view over a fleet snapshot.

use crate::common::{HostId, TenantId};
use crate::error::CapacityError;
use crate::fleet::FleetSnapshot;
use crate::resources::Resources;

/// Answers capacity questions about the hosts of a snapshot. Pure view,
/// no mutation.
pub struct HostCapacity<'a> {
    snapshot: &'a FleetSnapshot,
}

impl<'a> HostCapacity<'a> {
    pub fn new(snapshot: &'a FleetSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &FleetSnapshot {
        self.snapshot
    }

    /// The resources of the given host left over after its current tenants,
    /// saturating at zero on overcommitted axes.
    pub fn free_capacity_of(&self, host: HostId) -> Result<Resources, CapacityError> {
        let allocated = self.allocated_on(host)?;
        self.snapshot.host(host).resources().subtract(&allocated)
    }

    /// The summed resources of the tenants currently placed on the given host.
    pub fn allocated_on(&self, host: HostId) -> Result<Resources, CapacityError> {
        let mut allocated = Resources::zero();
        for &tenant in self.snapshot.children_of(host) {
            allocated = allocated.add(self.snapshot.tenant(tenant).resources())?;
        }
        Ok(allocated)
    }

    /// The `count` hosts with the largest free capacity among the eligible
    /// ones, ties broken by hostname ascending. Returns fewer hosts when the
    /// eligible list is shorter than `count`.
    pub fn find_spare_hosts(
        &self,
        eligible: &[HostId],
        count: usize,
    ) -> Result<Vec<HostId>, CapacityError> {
        let mut ranked = Vec::with_capacity(eligible.len());
        for &host in eligible {
            ranked.push((host, self.free_capacity_of(host)?));
        }
        ranked.sort_by(|(a, free_a), (b, free_b)| {
            free_b
                .cmp_size(free_a)
                .then_with(|| self.snapshot.host(*a).hostname().cmp(self.snapshot.host(*b).hostname()))
        });
        Ok(ranked.into_iter().take(count).map(|(host, _)| host).collect())
    }

    /// The tenants placed on the given host, in hostname order.
    pub fn children_of(&self, host: HostId) -> &[TenantId] {
        self.snapshot.children_of(host)
    }
}
