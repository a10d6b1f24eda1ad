//! The reconcile pass and its periodic worker.
//!
//! A pass:
//! - Lists the addresses of the configured address space
//! - Computes usage from `Configuring` and `Active` addresses
//! - Admits `Pending` addresses against the quota
//! - Provisions and scales router and broker clusters for the new usage
//! - Writes changed addresses back to the address store

mod reconciler;
mod worker;

pub use reconciler::{AddressController, Collaborators, ControllerError, ReconcileStats};
pub use worker::ControllerWorker;
