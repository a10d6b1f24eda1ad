//! Whole-pass reconcile tests.
//!
//! Each test drives an `AddressController` through the in-memory fakes and
//! asserts on what the address store and cluster API observe:
//!
//! 1. A pending queue is admitted and its broker created
//! 2. Tiny queues pack onto a nearly full broker, then spill
//! 3. A subscription follows its pending topic in the same pass
//! 4. A sharded topic over the broker allowance stays pending
//! 5. A failed cluster generation fails only its owner
//!
//! ## Running
//!
//! ```bash
//! cargo test -p fleet-e2e --test reconcile
//! ```

use std::sync::Arc;

use fleet_events::{ControllerKind, ControllerReason, EventSeverity};
use fleet_id::{sharded_cluster_id, ClusterId};
use fleet_model::{Address, BrokerCluster, Phase, ResourceBundle, StandardSchema};
use fleet_standard_controller::controller::{AddressController, Collaborators};
use fleet_testing::{
    cluster_id, placed_on, queue, standard_schema, standard_schema_with, subscription, topic,
    FakeClusterGenerator, FakeKubernetes, InMemoryAddressApi, RecordingEventLogger, ADDRESS_SPACE,
};

struct Fleet {
    api: Arc<InMemoryAddressApi>,
    kubernetes: Arc<FakeKubernetes>,
    generator: Arc<FakeClusterGenerator>,
    events: Arc<RecordingEventLogger>,
    controller: AddressController,
}

impl Fleet {
    fn new(schema: StandardSchema, kubernetes: FakeKubernetes, addresses: Vec<Address>) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let api = Arc::new(InMemoryAddressApi::new(addresses));
        let kubernetes = Arc::new(kubernetes);
        let generator = Arc::new(FakeClusterGenerator::new());
        let events = Arc::new(RecordingEventLogger::new());
        let collaborators = Collaborators::new(api.clone(), kubernetes.clone(), generator.clone())
            .with_events(events.clone());
        Self {
            api,
            kubernetes,
            generator,
            events,
            controller: AddressController::from_schema(ADDRESS_SPACE, schema, collaborators),
        }
    }

    fn address(&self, address: &str) -> Address {
        self.api
            .get(address)
            .unwrap_or_else(|| panic!("address {address} missing from store"))
    }

    /// Mark every admitted address `Active`, as the agent would once the
    /// broker is configured.
    fn activate(&self, addresses: &[&str]) {
        for name in addresses {
            let mut address = self.address(name);
            address.status.phase = Phase::Active;
            self.api.put(address);
        }
    }
}

fn sharded_id(address: &Address) -> ClusterId {
    sharded_cluster_id(&address.name, &address.address)
}

fn existing_pooled_broker(replicas: u32) -> BrokerCluster {
    BrokerCluster::new(cluster_id("broker"), replicas, ResourceBundle::default())
}

#[tokio::test]
async fn test_pending_queue_admitted_and_provisioned() {
    let fleet = Fleet::new(
        standard_schema_with(1.0, 3.0, 3.0),
        FakeKubernetes::new(),
        vec![queue("q1", "small-queue")],
    );

    let stats = fleet.controller.reconcile_once().await.unwrap();

    assert_eq!(stats.admitted, 1);
    let q1 = fleet.address("q1");
    assert_eq!(q1.phase(), Phase::Configuring);
    assert_eq!(q1.broker_id().unwrap(), "broker-0");
    assert_eq!(fleet.kubernetes.router_replicas(), 1);
    assert_eq!(fleet.kubernetes.broker_replicas().get("broker"), Some(&1));

    let created = fleet.events.with_reason(ControllerReason::BrokerCreated);
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].severity, EventSeverity::Normal);
    assert_eq!(created[0].kind, ControllerKind::Broker);
}

#[tokio::test]
async fn test_tiny_queues_pack_then_spill() {
    // broker-0 carries 0.6 + 3 * 0.1 of existing usage.
    let mut addresses = vec![placed_on(queue("large", "pooled-queue-large"), "broker-0")];
    for name in ["s1", "s2", "s3"] {
        addresses.push(placed_on(queue(name, "pooled-queue-small"), "broker-0"));
    }
    for name in ["t1", "t2", "t3"] {
        addresses.push(queue(name, "pooled-queue-tiny"));
    }
    let fleet = Fleet::new(
        standard_schema(),
        FakeKubernetes::new().with_broker(existing_pooled_broker(1)),
        addresses,
    );

    fleet.controller.reconcile_once().await.unwrap();

    assert_eq!(fleet.address("t1").broker_id().unwrap(), "broker-0");
    assert_eq!(fleet.address("t2").broker_id().unwrap(), "broker-0");
    assert_eq!(fleet.address("t3").broker_id().unwrap(), "broker-1");
    assert_eq!(
        fleet.kubernetes.scaled_stateful_sets(),
        vec![(cluster_id("broker"), 2)]
    );
    assert!(fleet.generator.generated().is_empty());
}

#[tokio::test]
async fn test_subscription_follows_pending_topic() {
    let fleet = Fleet::new(
        standard_schema(),
        FakeKubernetes::new(),
        vec![
            subscription("sub", "events", "small-subscription"),
            topic("events", "small-topic"),
        ],
    );

    let stats = fleet.controller.reconcile_once().await.unwrap();

    assert_eq!(stats.admitted, 2);
    let events = fleet.address("events");
    let sub = fleet.address("sub");
    assert_eq!(events.phase(), Phase::Configuring);
    assert_eq!(sub.phase(), Phase::Configuring);
    assert_eq!(sub.broker_id(), events.broker_id());
    assert_eq!(sub.cluster_id(), events.cluster_id());
}

#[tokio::test]
async fn test_subscriptions_of_sharded_topic_use_shards() {
    let big = topic("big", "xlarge-topic");
    let big_cluster = sharded_id(&big);
    let fleet = Fleet::new(
        standard_schema_with(1.0, 3.0, 4.0),
        FakeKubernetes::new(),
        vec![
            big,
            subscription("s1", "big", "small-subscription"),
            subscription("s2", "big", "small-subscription"),
        ],
    );

    fleet.controller.reconcile_once().await.unwrap();

    let s1 = fleet.address("s1");
    assert_eq!(s1.cluster_id(), Some(&big_cluster));
    assert_eq!(s1.broker_id().unwrap().as_str(), format!("{big_cluster}-0"));
    assert_eq!(fleet.address("s2").phase(), Phase::Configuring);
    assert_eq!(
        fleet.generator.generated(),
        vec![(big_cluster.clone(), "broker-topic".to_string(), 2)]
    );
    assert_eq!(fleet.kubernetes.broker_replicas().get(big_cluster.as_str()), Some(&2));
}

#[tokio::test]
async fn test_sharded_topic_over_allowance_stays_pending() {
    let large = queue("large", "large-queue").with_phase(Phase::Active);
    let large = {
        let cluster = sharded_id(&large);
        large.with_cluster_id(cluster)
    };
    let fleet = Fleet::new(
        standard_schema_with(1.0, 3.0, 10.0),
        FakeKubernetes::new(),
        vec![
            large,
            placed_on(queue("pooled", "pooled-queue-small"), "broker-0"),
            topic("big", "xlarge-topic"),
        ],
    );

    let stats = fleet.controller.reconcile_once().await.unwrap();

    assert_eq!(stats.rejected, 1);
    let big = fleet.address("big");
    assert_eq!(big.phase(), Phase::Pending);
    assert_eq!(big.status.messages, vec!["Quota exceeded".to_string()]);
    assert!(big.cluster_id().is_none());
    assert!(!fleet
        .generator
        .generated()
        .iter()
        .any(|(id, _, _)| *id == sharded_id(&big)));

    let warnings = fleet.events.with_reason(ControllerReason::QuotaExceeded);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].subject, "big");
}

#[tokio::test]
async fn test_generator_failure_fails_only_owner() {
    let big = topic("big", "xlarge-topic");
    let big_cluster = sharded_id(&big);
    let fleet = Fleet::new(
        standard_schema_with(1.0, 3.0, 4.0),
        FakeKubernetes::new(),
        vec![big, queue("q1", "small-queue")],
    );
    fleet.generator.fail_for(big_cluster.as_str());

    let stats = fleet.controller.reconcile_once().await.unwrap();

    assert_eq!(stats.admitted, 2);
    assert_eq!(stats.clusters_failed, 1);
    let big = fleet.address("big");
    assert_eq!(big.phase(), Phase::Failed);
    assert_eq!(
        big.status.messages,
        vec![format!(
            "Error creating broker: template error: no template for {big_cluster}"
        )]
    );
    assert_eq!(fleet.address("q1").phase(), Phase::Configuring);
    assert_eq!(fleet.kubernetes.broker_replicas().get("broker"), Some(&1));

    let warnings = fleet.events.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].reason, ControllerReason::BrokerCreateFailed);
}

#[tokio::test]
async fn test_later_passes_build_on_earlier_placements() {
    let fleet = Fleet::new(
        standard_schema(),
        FakeKubernetes::new(),
        vec![queue("a", "pooled-queue-large")],
    );

    fleet.controller.reconcile_once().await.unwrap();
    fleet.activate(&["a"]);
    fleet.api.put(queue("b", "pooled-queue-large"));
    fleet.api.put(queue("c", "pooled-queue-small"));
    let second = fleet.controller.reconcile_once().await.unwrap();

    assert_eq!(second.pending, 2);
    assert_eq!(fleet.address("a").phase(), Phase::Active);
    assert_eq!(fleet.address("b").broker_id().unwrap(), "broker-1");
    assert_eq!(fleet.address("c").broker_id().unwrap(), "broker-0");
    assert_eq!(fleet.kubernetes.broker_replicas().get("broker"), Some(&2));
    assert_eq!(fleet.kubernetes.created().len(), 1);

    let third = fleet.controller.reconcile_once().await.unwrap();
    assert_eq!(third.pending, 0);
    assert_eq!(third.written, 0);
}

#[tokio::test]
async fn test_subscription_of_failed_topic_waits() {
    let failed = topic("gone", "small-topic").with_phase(Phase::Failed);
    let fleet = Fleet::new(
        standard_schema(),
        FakeKubernetes::new(),
        vec![failed, subscription("sub", "gone", "small-subscription")],
    );

    let stats = fleet.controller.reconcile_once().await.unwrap();

    assert_eq!(stats.admitted, 0);
    assert_eq!(stats.rejected, 0);
    assert_eq!(fleet.address("sub").phase(), Phase::Pending);
    assert!(fleet.api.writes().is_empty());
}
