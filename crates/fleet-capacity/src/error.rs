//! Error kinds surfaced by the capacity components.

use thiserror::Error;

/// Failure of a maintenance tick or of one of the analysis components.
///
/// Budget exhaustion in the solver and a refused deployment are not errors:
/// the former surfaces as an absent mitigation plan, the latter as a
/// [`MoveOutcome`](crate::deployment::MoveOutcome) branch.
#[derive(Debug, Error)]
pub enum CapacityError {
    /// The snapshot or an arithmetic operation on it violates a structural
    /// precondition, e.g. a tenant whose parent is not a known host or a
    /// combination of resources with conflicting categorical axes.
    #[error("precondition violated: {0}")]
    PreconditionViolated(String),

    /// The snapshot provider could not produce a fleet snapshot.
    #[error("fleet snapshot unavailable: {0}")]
    SnapshotUnavailable(String),
}
