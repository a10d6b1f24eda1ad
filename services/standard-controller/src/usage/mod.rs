//! Resource usage accounting.
//!
//! A [`UsageModel`] maps each [`ResourceKind`] to the instances that carry
//! it, and each instance to a [`UsageInfo`]:
//!
//! | Kind | Instance ids |
//! |------|--------------|
//! | `router` | `all` |
//! | `broker` | pooled brokers (`broker-<n>`) and sharded cluster ids |
//! | `subscription` | the broker (or shard) a subscription lives on |
//!
//! One unit of `used` is one broker's (or router's) full capacity, so
//! `needed` is the replica count the instance requires.

mod computer;

pub use computer::UsageComputer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Kinds of resources tracked in a usage model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Router,
    Broker,
    Subscription,
}

/// Resource names as they appear in plans and allowances.
const RESOURCE_NAMES: [(&str, ResourceKind); 3] = [
    ("router", ResourceKind::Router),
    ("broker", ResourceKind::Broker),
    ("subscription", ResourceKind::Subscription),
];

impl ResourceKind {
    /// Resolve a plan resource name.
    pub fn from_name(name: &str) -> Option<Self> {
        RESOURCE_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| *kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::Broker => "broker",
            Self::Subscription => "subscription",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Committed consumption of one instance.
///
/// `needed` is always `ceil(used)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageInfo {
    used: f64,
    needed: u32,
}

impl UsageInfo {
    pub fn new(used: f64) -> Self {
        let mut info = Self::default();
        info.add_used(used);
        info
    }

    pub fn used(&self) -> f64 {
        self.used
    }

    pub fn needed(&self) -> u32 {
        self.needed
    }

    pub fn add_used(&mut self, amount: f64) {
        self.used += amount;
        // Usage is bounded by plan amounts, far below u32::MAX.
        self.needed = self.used.ceil().max(0.0) as u32;
    }
}

/// Usage of one resource kind, keyed by instance id.
pub type ResourceUsage = BTreeMap<String, UsageInfo>;

/// Usage per resource kind and instance.
///
/// Ordered maps keep iteration, and therefore bin-packing tie breaks,
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageModel {
    resources: BTreeMap<ResourceKind, ResourceUsage>,
}

impl UsageModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourceUsage> {
        self.resources.get(&kind)
    }

    /// Usage of `kind`, creating an empty entry if absent.
    pub fn resource_mut(&mut self, kind: ResourceKind) -> &mut ResourceUsage {
        self.resources.entry(kind).or_default()
    }

    pub fn get(&self, kind: ResourceKind, instance: &str) -> Option<&UsageInfo> {
        self.resources.get(&kind).and_then(|r| r.get(instance))
    }

    pub fn contains(&self, kind: ResourceKind, instance: &str) -> bool {
        self.get(kind, instance).is_some()
    }

    /// Add `amount` to an instance, creating it if absent.
    pub fn add_used(&mut self, kind: ResourceKind, instance: &str, amount: f64) {
        self.resource_mut(kind)
            .entry(instance.to_string())
            .or_default()
            .add_used(amount);
    }

    /// Sum of `needed` over every instance of `kind`.
    pub fn sum_needed(&self, kind: ResourceKind) -> u32 {
        self.sum_needed_matching(kind, |_| true)
    }

    /// Sum of `needed` over the instances of `kind` accepted by `filter`.
    pub fn sum_needed_matching(&self, kind: ResourceKind, filter: impl Fn(&str) -> bool) -> u32 {
        self.resources
            .get(&kind)
            .map(|usage| {
                usage
                    .iter()
                    .filter(|(id, _)| filter(id))
                    .map(|(_, info)| info.needed())
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Sum of `needed` across every kind except subscriptions, which ride
    /// on broker capacity that is already counted.
    pub fn total_needed(&self) -> u32 {
        self.resources
            .keys()
            .filter(|kind| **kind != ResourceKind::Subscription)
            .map(|kind| self.sum_needed(*kind))
            .sum()
    }

    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.resources.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.values().all(|r| r.is_empty())
    }
}
