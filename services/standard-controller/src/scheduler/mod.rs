//! Admission of pending addresses against the address space quota.
//!
//! The scheduler is responsible for:
//! - Ordering pending addresses so that subscriptions follow their topic
//! - Placing each address on a pooled broker, a sharded cluster or a
//!   subscription shard (least-loaded first fit)
//! - Checking every resource and the aggregate against the allowances
//! - Writing placement annotations and the `Configuring` phase on admission,
//!   or `Pending` with a message on rejection
//!
//! Each address is checked against a working copy of the usage model; the
//! copy replaces the committed model only when the address is admitted.

mod error;
mod placement;
mod quota;

pub use error::{SchedulerError, SchedulerResult};
pub use placement::{
    Admission, Limits, Placement, PlacementFailure, PlacementStrategy, BROKER_CAPACITY,
};
pub use quota::{QuotaScheduler, RejectReason, Rejection, ScheduleOutcome, QUOTA_EXCEEDED_MESSAGE};
