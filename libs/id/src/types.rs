//! Typed name definitions for physical fleet resources.

use crate::define_name;

// =============================================================================
// Clusters and Brokers
// =============================================================================

define_name!(ClusterId);
define_name!(BrokerId);

// =============================================================================
// Tests
// =============================================================================
