//! Cluster provisioning.
//!
//! Turns a committed usage model into router and broker replica counts,
//! creating broker clusters that do not exist yet. Failures are isolated to
//! the cluster (and address) they concern.

mod provisioner;

pub use provisioner::{ClusterProvisioner, ProvisionStats};
