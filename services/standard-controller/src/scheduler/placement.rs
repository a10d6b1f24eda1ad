//! Placement vocabulary and the least-loaded first-fit rule.

use std::collections::BTreeMap;

use fleet_id::{BrokerId, ClusterId};
use fleet_model::{Address, AddressSpacePlan, ResolveError, AGGREGATE_ALLOWANCE};
use thiserror::Error;

use crate::usage::{ResourceKind, ResourceUsage, UsageModel};

/// Capacity of one broker instance.
pub const BROKER_CAPACITY: f64 = 1.0;

// =============================================================================
// Limits
// =============================================================================

/// Allowances of an address space, by resource kind plus the aggregate.
///
/// A resource without an allowance has a limit of zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Limits {
    resources: BTreeMap<ResourceKind, f64>,
    aggregate: f64,
}

impl Limits {
    pub fn from_plan(plan: &AddressSpacePlan) -> Self {
        let mut limits = Self::default();
        for allowance in &plan.resources {
            if allowance.resource_name == AGGREGATE_ALLOWANCE {
                limits.aggregate = allowance.max;
            } else if let Some(kind) = ResourceKind::from_name(&allowance.resource_name) {
                limits.resources.insert(kind, allowance.max);
            }
        }
        limits
    }

    pub fn limit(&self, kind: ResourceKind) -> f64 {
        self.resources.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn aggregate(&self) -> f64 {
        self.aggregate
    }
}

// =============================================================================
// Strategy
// =============================================================================

/// How a single resource request is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStrategy {
    /// Accrue to the shared router instance.
    Router,
    /// Colocate with the subscription's topic.
    Subscription,
    /// Bin-pack onto a shared `broker-<n>` instance.
    Pooled,
    /// Claim a dedicated cluster derived from the address.
    Sharded,
}

impl PlacementStrategy {
    /// Select the strategy for a request of `kind` by `address`.
    ///
    /// Returns `None` for kinds that plans cannot request directly.
    pub fn select(kind: ResourceKind, address: &Address, amount: f64) -> Option<Self> {
        match kind {
            ResourceKind::Router => Some(Self::Router),
            ResourceKind::Broker if address.is_subscription() => Some(Self::Subscription),
            ResourceKind::Broker if amount < BROKER_CAPACITY => Some(Self::Pooled),
            ResourceKind::Broker => Some(Self::Sharded),
            ResourceKind::Subscription => None,
        }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Annotations to write on an admitted address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    pub cluster_id: Option<ClusterId>,
    pub broker_id: Option<BrokerId>,
}

impl Placement {
    /// Write the placement into the address annotations.
    pub fn apply_to(&self, address: &mut Address) {
        if let Some(cluster_id) = &self.cluster_id {
            address.annotations.cluster_id = Some(cluster_id.clone());
        }
        if let Some(broker_id) = &self.broker_id {
            address.annotations.broker_id = Some(broker_id.clone());
        }
    }
}

/// Why an address could not be placed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementFailure {
    #[error("Unable to resolve plan: {0}")]
    UnresolvedPlan(#[from] ResolveError),

    #[error("No topic specified for subscription")]
    MissingTopic,

    #[error("Topic {0} not found")]
    TopicNotFound(String),

    #[error("Topic {0} has not been placed")]
    TopicNotPlaced(String),

    #[error("No quota available on broker {broker} for topic {topic}")]
    BrokerFull { broker: BrokerId, topic: String },

    #[error("No shard of cluster {cluster_id} has capacity for topic {topic}")]
    NoShardCapacity { cluster_id: ClusterId, topic: String },

    #[error("Unable to find broker for scheduling")]
    NoPooledCapacity,

    #[error("Invalid broker id {0}")]
    InvalidBrokerId(String),
}

/// Result of checking one address against the quota.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// The address fits; `usage` is the new committed model.
    Committed { usage: UsageModel, placement: Placement },
    /// A resource or the aggregate would exceed its allowance.
    QuotaExceeded {
        resource: String,
        needed: u32,
        limit: f64,
    },
    /// No instance could take the address.
    PlacementFailed { reason: PlacementFailure },
}

impl Admission {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

// =============================================================================
// Bin packing
// =============================================================================

/// Instances of `usage` accepted by `filter` with their used credit, least
/// loaded first. Ties keep instance id order.
pub(crate) fn by_credit(
    usage: Option<&ResourceUsage>,
    filter: impl Fn(&str) -> bool,
) -> Vec<(String, f64)> {
    let mut candidates: Vec<(String, f64)> = usage
        .into_iter()
        .flatten()
        .filter(|(id, _)| filter(id.as_str()))
        .map(|(id, info)| (id.clone(), info.used()))
        .collect();
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
    candidates
}

/// First candidate whose credit plus `amount` stays strictly below capacity.
///
/// The comparison is strict, so `0.5 + 0.5` does not fit.
pub(crate) fn first_fit(candidates: &[(String, f64)], amount: f64) -> Option<&str> {
    candidates
        .iter()
        .find(|(_, credit)| credit + amount < BROKER_CAPACITY)
        .map(|(id, _)| id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_model::{AddressKind, ResourceAllowance};
    use rstest::rstest;

    fn usage(entries: &[(&str, f64)]) -> ResourceUsage {
        let mut usage = UsageModel::new();
        for (id, used) in entries {
            usage.add_used(ResourceKind::Broker, id, *used);
        }
        usage.resource(ResourceKind::Broker).cloned().unwrap_or_default()
    }

    #[test]
    fn test_by_credit_sorts_least_loaded_first() {
        let usage = usage(&[("broker-0", 0.7), ("broker-1", 0.2), ("broker-2", 0.2), ("other", 0.0)]);
        let candidates = by_credit(Some(&usage), fleet_id::is_pooled_broker);
        let ids: Vec<&str> = candidates.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["broker-1", "broker-2", "broker-0"]);
    }

    #[rstest]
    #[case(0.5, 0.5, false)]
    #[case(0.5, 0.49, true)]
    #[case(0.95, 0.049, true)]
    #[case(0.999, 0.049, false)]
    #[case(0.0, 1.0, false)]
    fn test_first_fit_is_strict(#[case] credit: f64, #[case] amount: f64, #[case] fits: bool) {
        let candidates = vec![("broker-0".to_string(), credit)];
        assert_eq!(first_fit(&candidates, amount).is_some(), fits);
    }

    #[test]
    fn test_first_fit_skips_full_instances() {
        let candidates = vec![("broker-1".to_string(), 0.6), ("broker-0".to_string(), 0.9)];
        assert_eq!(first_fit(&candidates, 0.3), Some("broker-1"));
        assert_eq!(first_fit(&candidates, 0.5), None);
    }

    #[test]
    fn test_limits_missing_allowance_is_zero() {
        let plan = AddressSpacePlan {
            name: "plan".to_string(),
            address_space_type: "standard".to_string(),
            address_plans: vec![],
            resources: vec![
                ResourceAllowance::new("router", 0.0, 1.0),
                ResourceAllowance::new("aggregate", 0.0, 2.0),
            ],
        };
        let limits = Limits::from_plan(&plan);
        assert_eq!(limits.limit(ResourceKind::Router), 1.0);
        assert_eq!(limits.limit(ResourceKind::Broker), 0.0);
        assert_eq!(limits.aggregate(), 2.0);
    }

    #[rstest]
    #[case(ResourceKind::Router, AddressKind::Queue, 0.2, Some(PlacementStrategy::Router))]
    #[case(ResourceKind::Broker, AddressKind::Queue, 0.4, Some(PlacementStrategy::Pooled))]
    #[case(ResourceKind::Broker, AddressKind::Topic, 1.0, Some(PlacementStrategy::Sharded))]
    #[case(ResourceKind::Broker, AddressKind::Subscription, 0.1, Some(PlacementStrategy::Subscription))]
    #[case(ResourceKind::Subscription, AddressKind::Queue, 0.1, None)]
    fn test_strategy_selection(
        #[case] kind: ResourceKind,
        #[case] address_kind: AddressKind,
        #[case] amount: f64,
        #[case] expected: Option<PlacementStrategy>,
    ) {
        let address = Address::new("s.a", "a", address_kind, "plan");
        assert_eq!(PlacementStrategy::select(kind, &address, amount), expected);
    }

    #[test]
    fn test_placement_only_sets_present_fields() {
        let mut address = Address::new("s.a", "a", AddressKind::Queue, "plan")
            .with_broker_id("broker-3".parse().unwrap());
        Placement {
            cluster_id: Some("broker".parse().unwrap()),
            broker_id: None,
        }
        .apply_to(&mut address);
        assert_eq!(address.cluster_id().unwrap(), "broker");
        assert_eq!(address.broker_id().unwrap(), "broker-3");
    }
}
