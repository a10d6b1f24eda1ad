//! Scheduler errors.

use fleet_id::ClusterId;
use thiserror::Error;

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Faults that abort scheduling.
///
/// Quota and placement outcomes are not errors; they are reported per
/// address through [`super::Admission`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A sharded cluster id already had usage when its owner was admitted.
    #[error("found unexpected conflicting usage for address {address} on cluster {cluster_id}")]
    ConflictingUsage {
        address: String,
        cluster_id: ClusterId,
    },
}
