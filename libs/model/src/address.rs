//! Addresses and the per-pass address arena.

use std::collections::BTreeMap;

use fleet_id::{BrokerId, ClusterId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Address Kind
// =============================================================================

/// The semantic type of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    Queue,
    Topic,
    Anycast,
    Multicast,
    Subscription,
}

impl AddressKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::Topic => "topic",
            Self::Anycast => "anycast",
            Self::Multicast => "multicast",
            Self::Subscription => "subscription",
        }
    }
}

impl std::fmt::Display for AddressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Status
// =============================================================================

/// Lifecycle phase of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for admission (new, or held back by quota/placement).
    #[default]
    Pending,
    /// Admitted and placed; infrastructure is being configured.
    Configuring,
    /// Fully configured.
    Active,
    /// Provisioning failed; needs intervention.
    Failed,
}

impl Phase {
    /// Returns true for phases whose resources count as committed usage.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Configuring | Self::Active)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Configuring => "Configuring",
            Self::Active => "Active",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Address status: a phase plus free-text messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub phase: Phase,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl Status {
    pub fn set_phase(&mut self, phase: Phase) -> &mut Self {
        self.phase = phase;
        self
    }

    pub fn append_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.messages.push(message.into());
        self
    }

    pub fn clear_messages(&mut self) -> &mut Self {
        self.messages.clear();
        self
    }
}

// =============================================================================
// Annotations
// =============================================================================

/// Placement annotations written by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<ClusterId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_id: Option<BrokerId>,
}

// =============================================================================
// Address
// =============================================================================

/// A logical messaging destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    /// Resource name; seeds the sharded cluster id.
    pub name: String,
    /// Address string, unique within the address space.
    pub address: String,
    pub address_space: String,
    #[serde(rename = "type")]
    pub kind: AddressKind,
    /// Name of the address plan.
    pub plan: String,
    /// Address of the topic a subscription belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub status: Status,
}

impl Address {
    /// Create a pending address in the `default` address space.
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        kind: AddressKind,
        plan: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            address_space: "default".to_string(),
            kind,
            plan: plan.into(),
            topic: None,
            annotations: Annotations::default(),
            status: Status::default(),
        }
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    #[must_use]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.status.phase = phase;
        self
    }

    #[must_use]
    pub fn with_cluster_id(mut self, cluster_id: ClusterId) -> Self {
        self.annotations.cluster_id = Some(cluster_id);
        self
    }

    #[must_use]
    pub fn with_broker_id(mut self, broker_id: BrokerId) -> Self {
        self.annotations.broker_id = Some(broker_id);
        self
    }

    pub fn is_subscription(&self) -> bool {
        self.kind == AddressKind::Subscription
    }

    pub fn phase(&self) -> Phase {
        self.status.phase
    }

    pub fn cluster_id(&self) -> Option<&ClusterId> {
        self.annotations.cluster_id.as_ref()
    }

    pub fn broker_id(&self) -> Option<&BrokerId> {
        self.annotations.broker_id.as_ref()
    }
}

// =============================================================================
// Address Set
// =============================================================================

/// The addresses of one reconcile pass, keyed by address string.
///
/// A pass owns its set exclusively; the scheduler and provisioner mutate
/// annotations and status in place through it. Iteration is ordered by
/// address string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressSet {
    addresses: BTreeMap<String, Address>,
}

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address, returning any address it replaced.
    pub fn insert(&mut self, address: Address) -> Option<Address> {
        self.addresses.insert(address.address.clone(), address)
    }

    pub fn get(&self, address: &str) -> Option<&Address> {
        self.addresses.get(address)
    }

    pub fn get_mut(&mut self, address: &str) -> Option<&mut Address> {
        self.addresses.get_mut(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains_key(address)
    }

    /// Look up the topic a subscription refers to.
    pub fn topic_of(&self, subscription: &Address) -> Option<&Address> {
        subscription.topic.as_deref().and_then(|t| self.get(t))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.addresses.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Address> {
        self.addresses.values_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.addresses.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn into_addresses(self) -> Vec<Address> {
        self.addresses.into_values().collect()
    }
}

impl FromIterator<Address> for AddressSet {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        let mut set = Self::new();
        for address in iter {
            set.insert(address);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        let mut status = Status::default();
        assert_eq!(status.phase, Phase::Pending);
        status
            .set_phase(Phase::Pending)
            .append_message("Quota exceeded")
            .append_message("Quota exceeded");
        assert_eq!(status.messages.len(), 2);
        status.clear_messages();
        assert!(status.messages.is_empty());
    }

    #[test]
    fn test_phase_is_admitted() {
        assert!(Phase::Configuring.is_admitted());
        assert!(Phase::Active.is_admitted());
        assert!(!Phase::Pending.is_admitted());
        assert!(!Phase::Failed.is_admitted());
    }

    #[test]
    fn test_address_set_keyed_by_address_string() {
        let set: AddressSet = vec![
            Address::new("s.b", "b", AddressKind::Queue, "small-queue"),
            Address::new("s.a", "a", AddressKind::Topic, "small-topic"),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(set.contains("a"));
        assert!(!set.contains("s.a"));
    }

    #[test]
    fn test_topic_of() {
        let set: AddressSet = vec![
            Address::new("s.t", "t", AddressKind::Topic, "small-topic"),
            Address::new("s.sub", "sub", AddressKind::Subscription, "small-subscription")
                .with_topic("t"),
            Address::new("s.orphan", "orphan", AddressKind::Subscription, "small-subscription")
                .with_topic("missing"),
        ]
        .into_iter()
        .collect();

        let sub = set.get("sub").unwrap();
        assert_eq!(set.topic_of(sub).unwrap().address, "t");
        let orphan = set.get("orphan").unwrap();
        assert!(set.topic_of(orphan).is_none());
    }

    #[test]
    fn test_address_json_shape() {
        let address = Address::new("s.q", "q", AddressKind::Queue, "pooled-queue-small")
            .with_broker_id("broker-0".parse().unwrap());
        let json = serde_json::to_value(&address).unwrap();
        assert_eq!(json["type"], "queue");
        assert_eq!(json["annotations"]["broker_id"], "broker-0");
        assert!(json["annotations"].get("cluster_id").is_none());
        assert_eq!(json["status"]["phase"], "Pending");
    }
}
