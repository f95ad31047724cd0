//! Arithmetic on node resource vectors.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::CapacityError;

/// Disk speed required by a tenant or provided by a host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskSpeed {
    Fast,
    Slow,
    /// Matches any concrete speed.
    Any,
}

/// Storage backing required by a tenant or provided by a host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Local,
    Remote,
    /// Matches any concrete storage type.
    Any,
}

impl Display for DiskSpeed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            DiskSpeed::Fast => write!(f, "fast"),
            DiskSpeed::Slow => write!(f, "slow"),
            DiskSpeed::Any => write!(f, "any"),
        }
    }
}

impl Display for StorageType {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            StorageType::Local => write!(f, "local"),
            StorageType::Remote => write!(f, "remote"),
            StorageType::Any => write!(f, "any"),
        }
    }
}

impl DiskSpeed {
    /// Two speeds are compatible when equal or when either side is `Any`.
    pub fn compatible_with(self, other: DiskSpeed) -> bool {
        self == DiskSpeed::Any || other == DiskSpeed::Any || self == other
    }

    fn combine_with(self, other: DiskSpeed) -> Result<DiskSpeed, CapacityError> {
        match (self, other) {
            (DiskSpeed::Any, s) => Ok(s),
            (s, DiskSpeed::Any) => Ok(s),
            (a, b) if a == b => Ok(a),
            (a, b) => Err(CapacityError::PreconditionViolated(format!(
                "conflicting disk speeds: {} vs {}",
                a, b
            ))),
        }
    }
}

impl StorageType {
    /// Two storage types are compatible when equal or when either side is `Any`.
    pub fn compatible_with(self, other: StorageType) -> bool {
        self == StorageType::Any || other == StorageType::Any || self == other
    }

    fn combine_with(self, other: StorageType) -> Result<StorageType, CapacityError> {
        match (self, other) {
            (StorageType::Any, s) => Ok(s),
            (s, StorageType::Any) => Ok(s),
            (a, b) if a == b => Ok(a),
            (a, b) => Err(CapacityError::PreconditionViolated(format!(
                "conflicting storage types: {} vs {}",
                a, b
            ))),
        }
    }
}

/// Resource envelope of a host, or resource requirement of a tenant.
///
/// The numeric components form a partial order under [`satisfies`](Resources::satisfies);
/// the categorical components use `Any` as a wildcard matching every concrete value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    pub bandwidth: f64,
    pub gpu: f64,
    pub disk_speed: DiskSpeed,
    pub storage_type: StorageType,
}

impl Resources {
    /// Creates resources with the given scalar components, no GPUs and
    /// wildcard categorical axes.
    pub fn new(cpu: f64, memory: f64, disk: f64, bandwidth: f64) -> Self {
        Self {
            cpu,
            memory,
            disk,
            bandwidth,
            gpu: 0.,
            disk_speed: DiskSpeed::Any,
            storage_type: StorageType::Any,
        }
    }

    /// The zero vector with wildcard categorical axes. Identity of [`add`](Resources::add).
    pub fn zero() -> Self {
        Self::new(0., 0., 0., 0.)
    }

    pub fn with_disk_speed(mut self, disk_speed: DiskSpeed) -> Self {
        self.disk_speed = disk_speed;
        self
    }

    pub fn with_storage_type(mut self, storage_type: StorageType) -> Self {
        self.storage_type = storage_type;
        self
    }

    pub fn with_gpu(mut self, gpu: f64) -> Self {
        self.gpu = gpu;
        self
    }

    /// Checks whether this amount of resources can accommodate the required
    /// amount: every scalar component must be at least as large and the
    /// categorical axes must be compatible.
    pub fn satisfies(&self, required: &Resources) -> bool {
        self.cpu >= required.cpu
            && self.memory >= required.memory
            && self.disk >= required.disk
            && self.bandwidth >= required.bandwidth
            && self.gpu >= required.gpu
            && self.disk_speed.compatible_with(required.disk_speed)
            && self.storage_type.compatible_with(required.storage_type)
    }

    /// Component-wise sum. Categorical axes are combined, with `Any`
    /// yielding to the concrete side; a concrete/concrete conflict is a
    /// precondition violation.
    pub fn add(&self, other: &Resources) -> Result<Resources, CapacityError> {
        Ok(Resources {
            cpu: self.cpu + other.cpu,
            memory: self.memory + other.memory,
            disk: self.disk + other.disk,
            bandwidth: self.bandwidth + other.bandwidth,
            gpu: self.gpu + other.gpu,
            disk_speed: self.disk_speed.combine_with(other.disk_speed)?,
            storage_type: self.storage_type.combine_with(other.storage_type)?,
        })
    }

    /// Component-wise difference, saturating at zero per scalar component.
    /// Categorical axes combine exactly as in [`add`](Resources::add).
    pub fn subtract(&self, other: &Resources) -> Result<Resources, CapacityError> {
        Ok(Resources {
            cpu: (self.cpu - other.cpu).max(0.),
            memory: (self.memory - other.memory).max(0.),
            disk: (self.disk - other.disk).max(0.),
            bandwidth: (self.bandwidth - other.bandwidth).max(0.),
            gpu: (self.gpu - other.gpu).max(0.),
            disk_speed: self.disk_speed.combine_with(other.disk_speed)?,
            storage_type: self.storage_type.combine_with(other.storage_type)?,
        })
    }

    /// Whether any scalar component strictly exceeds the corresponding
    /// component of the given envelope. Used for overcommit detection, so
    /// categorical axes are ignored.
    pub fn exceeds_any_of(&self, envelope: &Resources) -> bool {
        self.cpu > envelope.cpu
            || self.memory > envelope.memory
            || self.disk > envelope.disk
            || self.bandwidth > envelope.bandwidth
            || self.gpu > envelope.gpu
    }

    /// Deterministic size ordering used for "largest free capacity" and
    /// "largest tenant" decisions: lexicographic over
    /// (cpu, memory, disk, bandwidth, gpu).
    pub fn cmp_size(&self, other: &Resources) -> Ordering {
        self.cpu
            .total_cmp(&other.cpu)
            .then(self.memory.total_cmp(&other.memory))
            .then(self.disk.total_cmp(&other.disk))
            .then(self.bandwidth.total_cmp(&other.bandwidth))
            .then(self.gpu.total_cmp(&other.gpu))
    }
}

impl Display for Resources {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[cpu: {}, memory: {}, disk: {}, bandwidth: {}, gpu: {}, disk speed: {}, storage type: {}]",
            self.cpu, self.memory, self.disk, self.bandwidth, self.gpu, self.disk_speed, self.storage_type
        )
    }
}
