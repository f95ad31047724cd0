//! Immutable fleet snapshot: hosts, tenants and their placement at a
//! maintenance tick.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::common::{HostId, TenantId};
use crate::error::CapacityError;
use crate::resources::Resources;

/// Lifecycle state of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NodeState {
    Active,
    Reserved,
    Failed,
    Parked,
}

/// A node with no parent: a physical machine able to host tenant workloads.
#[derive(Clone, Debug, Serialize)]
pub struct Host {
    hostname: String,
    resources: Resources,
    state: NodeState,
}

impl Host {
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The total resource envelope of this host.
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn state(&self) -> NodeState {
        self.state
    }
}

/// A workload placed on a host.
#[derive(Clone, Debug, Serialize)]
pub struct Tenant {
    hostname: String,
    resources: Resources,
    parent: HostId,
    state: NodeState,
    retired: bool,
}

impl Tenant {
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The resources this tenant requires wherever it is placed.
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// The host this tenant is currently placed on.
    pub fn parent(&self) -> HostId {
        self.parent
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Whether this tenant is marked for removal from its current host.
    /// A retired tenant still occupies capacity until its relocation completes.
    pub fn retired(&self) -> bool {
        self.retired
    }
}

/// An immutable collection of hosts and tenants, indexed by id, hostname and
/// placement. All analysis within one maintenance tick runs against a single
/// snapshot; nothing of it survives the tick.
#[derive(Clone, Debug)]
pub struct FleetSnapshot {
    hosts: Vec<Host>,
    tenants: Vec<Tenant>,
    // children of each host, sorted by tenant hostname
    children: Vec<Vec<TenantId>>,
    host_index: BTreeMap<String, HostId>,
    tenant_index: BTreeMap<String, TenantId>,
}

impl FleetSnapshot {
    pub fn builder() -> FleetBuilder {
        FleetBuilder::new()
    }

    /// Returns ids of all hosts, in hostname order.
    pub fn host_ids(&self) -> Vec<HostId> {
        self.host_index.values().copied().collect()
    }

    /// Returns ids of all hosts in the given state, in hostname order.
    pub fn host_ids_in_state(&self, state: NodeState) -> Vec<HostId> {
        self.host_index
            .values()
            .copied()
            .filter(|id| self.host(*id).state() == state)
            .collect()
    }

    pub fn host(&self, id: HostId) -> &Host {
        &self.hosts[id.0 as usize]
    }

    pub fn tenant(&self, id: TenantId) -> &Tenant {
        &self.tenants[id.0 as usize]
    }

    /// The tenants currently placed on the given host, in hostname order.
    pub fn children_of(&self, host: HostId) -> &[TenantId] {
        &self.children[host.0 as usize]
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }

    pub fn find_host(&self, hostname: &str) -> Option<HostId> {
        self.host_index.get(hostname).copied()
    }

    pub fn find_tenant(&self, hostname: &str) -> Option<TenantId> {
        self.tenant_index.get(hostname).copied()
    }
}

/// Supplies the fleet snapshot at the start of each maintenance tick.
pub trait SnapshotProvider {
    fn snapshot(&self) -> Result<FleetSnapshot, CapacityError>;
}

struct TenantSpec {
    hostname: String,
    resources: Resources,
    parent_hostname: String,
    state: NodeState,
    retired: bool,
}

/// Builder assembling a validated [`FleetSnapshot`].
pub struct FleetBuilder {
    hosts: Vec<Host>,
    tenants: Vec<TenantSpec>,
}

impl FleetBuilder {
    pub fn new() -> Self {
        Self {
            hosts: Vec::new(),
            tenants: Vec::new(),
        }
    }

    /// Adds an active host.
    pub fn host(self, hostname: &str, resources: Resources) -> Self {
        self.host_in_state(hostname, resources, NodeState::Active)
    }

    pub fn host_in_state(mut self, hostname: &str, resources: Resources, state: NodeState) -> Self {
        self.hosts.push(Host {
            hostname: hostname.to_string(),
            resources,
            state,
        });
        self
    }

    /// Adds an active tenant placed on the named parent host.
    pub fn tenant(self, hostname: &str, resources: Resources, parent: &str) -> Self {
        self.tenant_in_state(hostname, resources, parent, NodeState::Active, false)
    }

    /// Adds an active tenant marked as retired, i.e. with a relocation
    /// already under way.
    pub fn retired_tenant(self, hostname: &str, resources: Resources, parent: &str) -> Self {
        self.tenant_in_state(hostname, resources, parent, NodeState::Active, true)
    }

    pub fn tenant_in_state(
        mut self,
        hostname: &str,
        resources: Resources,
        parent: &str,
        state: NodeState,
        retired: bool,
    ) -> Self {
        self.tenants.push(TenantSpec {
            hostname: hostname.to_string(),
            resources,
            parent_hostname: parent.to_string(),
            state,
            retired,
        });
        self
    }

    /// Validates the collected nodes and produces the snapshot.
    ///
    /// Fails when a hostname occurs twice or when a tenant names a parent
    /// which is not a known host.
    pub fn build(self) -> Result<FleetSnapshot, CapacityError> {
        let mut host_index = BTreeMap::new();
        for (i, host) in self.hosts.iter().enumerate() {
            let previous = host_index.insert(host.hostname.clone(), HostId(i as u32));
            if previous.is_some() {
                return Err(CapacityError::PreconditionViolated(format!(
                    "duplicate host {}",
                    host.hostname
                )));
            }
        }

        let mut tenants = Vec::with_capacity(self.tenants.len());
        let mut tenant_index = BTreeMap::new();
        let mut children = vec![Vec::new(); self.hosts.len()];
        for (i, spec) in self.tenants.into_iter().enumerate() {
            let id = TenantId(i as u32);
            let parent = host_index.get(&spec.parent_hostname).copied().ok_or_else(|| {
                CapacityError::PreconditionViolated(format!(
                    "tenant {} has parent {} which is not a host",
                    spec.hostname, spec.parent_hostname
                ))
            })?;
            if host_index.contains_key(&spec.hostname) || tenant_index.contains_key(&spec.hostname) {
                return Err(CapacityError::PreconditionViolated(format!(
                    "duplicate node {}",
                    spec.hostname
                )));
            }
            tenant_index.insert(spec.hostname.clone(), id);
            children[parent.0 as usize].push(id);
            tenants.push(Tenant {
                hostname: spec.hostname,
                resources: spec.resources,
                parent,
                state: spec.state,
                retired: spec.retired,
            });
        }

        for list in children.iter_mut() {
            list.sort_by(|a, b| tenants[a.0 as usize].hostname.cmp(&tenants[b.0 as usize].hostname));
        }

        Ok(FleetSnapshot {
            hosts: self.hosts,
            tenants,
            children,
            host_index,
            tenant_index,
        })
    }
}

impl Default for FleetBuilder {
    fn default() -> Self {
        Self::new()
    }
}
