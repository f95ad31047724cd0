//! Common data structures.

use serde::Serialize;

/// Index of a host within a fleet snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct HostId(pub u32);

/// Index of a tenant within a fleet snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TenantId(pub u32);

/// Relocation of a single tenant from one host to another.
///
/// Two moves are equal iff the tenant and both hosts are equal. The source
/// and target host of a move are always distinct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Move {
    pub tenant: TenantId,
    pub from: HostId,
    pub to: HostId,
}

impl Move {
    pub fn new(tenant: TenantId, from: HostId, to: HostId) -> Self {
        Self { tenant, from, to }
    }
}
