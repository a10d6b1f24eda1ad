//! Schema and address fixtures.
//!
//! `standard_schema()` is a small standard address space with allowances
//! `{router: 1.0, broker: 3.0, aggregate: 3.0}` and these plans:
//!
//! | Plan | Type | router | broker |
//! |------|------|--------|--------|
//! | `small-anycast` | anycast | 0.2 | |
//! | `small-multicast` | multicast | 0.1 | |
//! | `pooled-queue-large` | queue | | 0.6 |
//! | `pooled-queue-small` | queue | | 0.1 |
//! | `pooled-queue-tiny` | queue | | 0.049 |
//! | `small-queue` | queue | 0.2 | 0.4 |
//! | `large-queue` | queue | 0.2 | 1.0 |
//! | `xlarge-queue` | queue | 0.2 | 2.0 |
//! | `small-topic` | topic | 0.1 | 0.2 |
//! | `xlarge-topic` | topic | 0.1 | 2.0 |
//! | `small-subscription` | subscription | 0.05 | 0.1 |

use fleet_id::{BrokerId, ClusterId};
use fleet_model::{
    Address, AddressKind, AddressPlan, AddressSpacePlan, AddressType, Phase, ResourceAllowance,
    ResourceDefinition, ResourceRequest, StandardSchema, AGGREGATE_ALLOWANCE,
};

/// Address space used by address fixtures.
pub const ADDRESS_SPACE: &str = "myspace";

/// The standard fixture schema with default allowances.
pub fn standard_schema() -> StandardSchema {
    standard_schema_with(1.0, 3.0, 3.0)
}

/// The standard fixture schema with custom router, broker and aggregate
/// allowances.
pub fn standard_schema_with(router: f64, broker: f64, aggregate: f64) -> StandardSchema {
    standard_schema_with_allowances(vec![
        ResourceAllowance::new("router", 0.0, router),
        ResourceAllowance::new("broker", 0.0, broker),
        ResourceAllowance::new(AGGREGATE_ALLOWANCE, 0.0, aggregate),
    ])
}

/// The standard fixture schema with an arbitrary allowance list.
pub fn standard_schema_with_allowances(allowances: Vec<ResourceAllowance>) -> StandardSchema {
    let address_types = vec![
        address_type(
            AddressKind::Anycast,
            vec![plan("small-anycast", AddressKind::Anycast, &[("router", 0.2)])],
        ),
        address_type(
            AddressKind::Multicast,
            vec![plan("small-multicast", AddressKind::Multicast, &[("router", 0.1)])],
        ),
        address_type(
            AddressKind::Queue,
            vec![
                plan("pooled-queue-large", AddressKind::Queue, &[("broker", 0.6)]),
                plan("pooled-queue-small", AddressKind::Queue, &[("broker", 0.1)]),
                plan("pooled-queue-tiny", AddressKind::Queue, &[("broker", 0.049)]),
                plan("small-queue", AddressKind::Queue, &[("router", 0.2), ("broker", 0.4)]),
                plan("large-queue", AddressKind::Queue, &[("router", 0.2), ("broker", 1.0)]),
                plan("xlarge-queue", AddressKind::Queue, &[("router", 0.2), ("broker", 2.0)]),
            ],
        ),
        address_type(
            AddressKind::Topic,
            vec![
                plan("small-topic", AddressKind::Topic, &[("router", 0.1), ("broker", 0.2)]),
                plan("xlarge-topic", AddressKind::Topic, &[("router", 0.1), ("broker", 2.0)]),
            ],
        ),
        address_type(
            AddressKind::Subscription,
            vec![plan(
                "small-subscription",
                AddressKind::Subscription,
                &[("router", 0.05), ("broker", 0.1)],
            )],
        ),
    ];

    let address_plans = address_types
        .iter()
        .flat_map(|t| t.plans.iter().map(|p| p.name.clone()))
        .collect();

    let address_space_plan = AddressSpacePlan {
        name: "plan1".to_string(),
        address_space_type: "standard".to_string(),
        address_plans,
        resources: allowances,
    };

    StandardSchema {
        address_space_plan,
        address_types,
        resource_definitions: vec![
            ResourceDefinition::new("router"),
            ResourceDefinition::new("broker"),
            ResourceDefinition::new("broker-topic"),
        ],
    }
}

fn address_type(kind: AddressKind, plans: Vec<AddressPlan>) -> AddressType {
    AddressType {
        kind,
        description: kind.to_string(),
        plans,
    }
}

fn plan(name: &str, address_type: AddressKind, requests: &[(&str, f64)]) -> AddressPlan {
    AddressPlan {
        name: name.to_string(),
        address_type,
        resources: requests
            .iter()
            .map(|(resource, amount)| ResourceRequest::new(*resource, *amount))
            .collect(),
    }
}

fn address(address: &str, kind: AddressKind, plan: &str) -> Address {
    let mut a = Address::new(format!("{ADDRESS_SPACE}.{address}"), address, kind, plan);
    a.address_space = ADDRESS_SPACE.to_string();
    a
}

/// A pending queue.
pub fn queue(name: &str, plan: &str) -> Address {
    address(name, AddressKind::Queue, plan)
}

/// A pending topic.
pub fn topic(name: &str, plan: &str) -> Address {
    address(name, AddressKind::Topic, plan)
}

/// A pending anycast address.
pub fn anycast(name: &str, plan: &str) -> Address {
    address(name, AddressKind::Anycast, plan)
}

/// A pending subscription on `topic`.
pub fn subscription(name: &str, topic: &str, plan: &str) -> Address {
    address(name, AddressKind::Subscription, plan).with_topic(topic)
}

/// Mark an address as placed on a pooled broker and `Active`.
pub fn placed_on(address: Address, broker: &str) -> Address {
    address
        .with_phase(Phase::Active)
        .with_cluster_id(fleet_id::pooled_cluster_id())
        .with_broker_id(broker_id(broker))
}

/// Parse a broker id, panicking on invalid input.
pub fn broker_id(id: &str) -> BrokerId {
    BrokerId::parse(id).unwrap_or_else(|e| panic!("invalid broker id {id}: {e}"))
}

/// Parse a cluster id, panicking on invalid input.
pub fn cluster_id(id: &str) -> ClusterId {
    ClusterId::parse(id).unwrap_or_else(|e| panic!("invalid cluster id {id}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_model::PlanResolver;

    #[test]
    fn test_fixture_schema_validates() {
        let schema = standard_schema();
        let json = serde_json::to_string(&schema).unwrap();
        let reloaded = StandardSchema::from_json(&json).unwrap();
        assert_eq!(reloaded, schema);
    }

    #[test]
    fn test_fixture_plans_resolve() {
        let schema = standard_schema();
        let sub = subscription("sub", "t", "small-subscription");
        let plan = schema.plan_for(&sub).unwrap();
        assert_eq!(plan.resources.len(), 2);
        assert_eq!(sub.name, "myspace.sub");
        assert_eq!(sub.topic.as_deref(), Some("t"));
    }
}
