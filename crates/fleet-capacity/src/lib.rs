#![doc = include_str!("../README.md")]

pub mod capacity_checker;
pub mod capacity_solver;
pub mod common;
pub mod config;
pub mod deployment;
pub mod error;
pub mod fleet;
pub mod host_capacity;
pub mod maintainer;
pub mod metrics;
pub mod resources;
pub mod subsets;

pub use capacity_checker::{CapacityChecker, HostFailurePath};
pub use capacity_solver::CapacitySolver;
pub use common::{HostId, Move, TenantId};
pub use config::MaintainerConfig;
pub use deployment::{Deployer, MoveOutcome};
pub use error::CapacityError;
pub use fleet::{FleetBuilder, FleetSnapshot, NodeState, SnapshotProvider};
pub use host_capacity::HostCapacity;
pub use maintainer::SpareCapacityMaintainer;
pub use metrics::MetricSink;
pub use resources::{DiskSpeed, Resources, StorageType};
