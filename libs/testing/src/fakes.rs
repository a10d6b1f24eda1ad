//! Recording fakes of the controller collaborators.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use fleet_events::{ControllerEvent, ControllerKind, ControllerReason, EventLogger, EventSeverity};
use fleet_id::ClusterId;
use fleet_model::{
    Address, AddressApi, BrokerCluster, ClientError, ClusterGenerator, Kubernetes, ResourceBundle,
    ResourceDefinition, RouterCluster,
};
use serde_json::json;

/// Poison-tolerant lock: a panicking test must not cascade into others.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// Kubernetes
// =============================================================================

#[derive(Debug)]
struct KubernetesState {
    router: RouterCluster,
    brokers: Vec<BrokerCluster>,
    created: Vec<ResourceBundle>,
    scaled_deployments: Vec<(String, u32)>,
    scaled_stateful_sets: Vec<(ClusterId, u32)>,
    fail_create: bool,
    fail_scale: BTreeSet<String>,
}

/// In-memory cluster API.
///
/// Created bundles that contain a `StatefulSet` become listed broker
/// clusters, and scale calls update the listed replica counts, so a second
/// reconcile pass observes the effects of the first.
#[derive(Debug)]
pub struct FakeKubernetes {
    state: Mutex<KubernetesState>,
}

impl Default for FakeKubernetes {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeKubernetes {
    pub fn new() -> Self {
        Self::with_router(RouterCluster::new("qdrouterd", 1))
    }

    pub fn with_router(router: RouterCluster) -> Self {
        Self {
            state: Mutex::new(KubernetesState {
                router,
                brokers: Vec::new(),
                created: Vec::new(),
                scaled_deployments: Vec::new(),
                scaled_stateful_sets: Vec::new(),
                fail_create: false,
                fail_scale: BTreeSet::new(),
            }),
        }
    }

    /// Add an already-running broker cluster.
    #[must_use]
    pub fn with_broker(self, cluster: BrokerCluster) -> Self {
        lock(&self.state).brokers.push(cluster);
        self
    }

    /// Make every `create` call fail.
    pub fn fail_create(&self) {
        lock(&self.state).fail_create = true;
    }

    /// Make scale calls for the named deployment or stateful set fail.
    pub fn fail_scale(&self, name: &str) {
        lock(&self.state).fail_scale.insert(name.to_string());
    }

    pub fn created(&self) -> Vec<ResourceBundle> {
        lock(&self.state).created.clone()
    }

    pub fn scaled_deployments(&self) -> Vec<(String, u32)> {
        lock(&self.state).scaled_deployments.clone()
    }

    pub fn scaled_stateful_sets(&self) -> Vec<(ClusterId, u32)> {
        lock(&self.state).scaled_stateful_sets.clone()
    }

    pub fn router_replicas(&self) -> u32 {
        lock(&self.state).router.replicas()
    }

    /// Replica counts of the listed broker clusters, by cluster id.
    pub fn broker_replicas(&self) -> BTreeMap<String, u32> {
        lock(&self.state)
            .brokers
            .iter()
            .map(|b| (b.cluster_id.to_string(), b.replicas()))
            .collect()
    }
}

/// Extract `(name, replicas)` of every `StatefulSet` item in a bundle.
fn stateful_sets(bundle: &ResourceBundle) -> Vec<(ClusterId, u32)> {
    bundle
        .items
        .iter()
        .filter(|item| item["kind"] == "StatefulSet")
        .filter_map(|item| {
            let name = item["metadata"]["name"].as_str()?;
            let replicas = item["spec"]["replicas"].as_u64()?;
            Some((name.parse().ok()?, u32::try_from(replicas).ok()?))
        })
        .collect()
}

#[async_trait]
impl Kubernetes for FakeKubernetes {
    async fn list_router_cluster(&self) -> Result<RouterCluster, ClientError> {
        Ok(lock(&self.state).router.clone())
    }

    async fn list_broker_clusters(&self) -> Result<Vec<BrokerCluster>, ClientError> {
        Ok(lock(&self.state).brokers.clone())
    }

    async fn create(&self, resources: &ResourceBundle) -> Result<(), ClientError> {
        let mut state = lock(&self.state);
        if state.fail_create {
            return Err(ClientError::Api("create rejected".to_string()));
        }
        for (cluster_id, replicas) in stateful_sets(resources) {
            state
                .brokers
                .push(BrokerCluster::new(cluster_id, replicas, resources.clone()));
        }
        state.created.push(resources.clone());
        Ok(())
    }

    async fn scale_deployment(&self, name: &str, replicas: u32) -> Result<(), ClientError> {
        let mut state = lock(&self.state);
        if state.fail_scale.contains(name) {
            return Err(ClientError::Api(format!("unable to scale deployment {name}")));
        }
        if state.router.name != name {
            return Err(ClientError::NotFound(format!("deployment {name}")));
        }
        let router_name = state.router.name.clone();
        state.router = RouterCluster::new(router_name, replicas);
        state.scaled_deployments.push((name.to_string(), replicas));
        Ok(())
    }

    async fn scale_stateful_set(
        &self,
        cluster_id: &ClusterId,
        replicas: u32,
    ) -> Result<(), ClientError> {
        let mut state = lock(&self.state);
        if state.fail_scale.contains(cluster_id.as_str()) {
            return Err(ClientError::Api(format!(
                "unable to scale stateful set {cluster_id}"
            )));
        }
        let Some(index) = state
            .brokers
            .iter()
            .position(|b| &b.cluster_id == cluster_id)
        else {
            return Err(ClientError::NotFound(format!("stateful set {cluster_id}")));
        };
        let resources = state.brokers[index].resources.clone();
        state.brokers[index] = BrokerCluster::new(cluster_id.clone(), replicas, resources);
        state.scaled_stateful_sets.push((cluster_id.clone(), replicas));
        Ok(())
    }
}

// =============================================================================
// Cluster generator
// =============================================================================

/// Cluster generator producing a single `StatefulSet` item per cluster.
#[derive(Debug, Default)]
pub struct FakeClusterGenerator {
    fail_for: Mutex<BTreeSet<String>>,
    empty_for: Mutex<BTreeSet<String>>,
    generated: Mutex<Vec<(ClusterId, String, u32)>>,
}

impl FakeClusterGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail generation for `cluster_id`.
    pub fn fail_for(&self, cluster_id: &str) {
        lock(&self.fail_for).insert(cluster_id.to_string());
    }

    /// Return an empty bundle for `cluster_id`.
    pub fn empty_for(&self, cluster_id: &str) {
        lock(&self.empty_for).insert(cluster_id.to_string());
    }

    /// Every successful generation as `(cluster id, definition name, replicas)`.
    pub fn generated(&self) -> Vec<(ClusterId, String, u32)> {
        lock(&self.generated).clone()
    }
}

impl ClusterGenerator for FakeClusterGenerator {
    fn generate_cluster(
        &self,
        cluster_id: &ClusterId,
        definition: &ResourceDefinition,
        replicas: u32,
        address: Option<&Address>,
    ) -> Result<BrokerCluster, ClientError> {
        if lock(&self.fail_for).contains(cluster_id.as_str()) {
            return Err(ClientError::Template(format!(
                "no template for {cluster_id}"
            )));
        }
        lock(&self.generated).push((cluster_id.clone(), definition.name.clone(), replicas));

        if lock(&self.empty_for).contains(cluster_id.as_str()) {
            return Ok(BrokerCluster::new(
                cluster_id.clone(),
                replicas,
                ResourceBundle::default(),
            ));
        }

        let item = json!({
            "kind": "StatefulSet",
            "metadata": {
                "name": cluster_id.as_str(),
                "annotations": {
                    "address": address.map(|a| a.address.as_str()),
                    "template": definition.template.as_deref().unwrap_or(&definition.name),
                },
            },
            "spec": { "replicas": replicas },
        });
        Ok(BrokerCluster::new(
            cluster_id.clone(),
            replicas,
            ResourceBundle::new(vec![item]),
        ))
    }
}

// =============================================================================
// Event logger
// =============================================================================

/// Event logger that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingEventLogger {
    events: Mutex<Vec<ControllerEvent>>,
}

impl RecordingEventLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ControllerEvent> {
        lock(&self.events).clone()
    }

    pub fn warnings(&self) -> Vec<ControllerEvent> {
        lock(&self.events)
            .iter()
            .filter(|e| e.is_warning())
            .cloned()
            .collect()
    }

    pub fn with_reason(&self, reason: ControllerReason) -> Vec<ControllerEvent> {
        lock(&self.events)
            .iter()
            .filter(|e| e.reason == reason)
            .cloned()
            .collect()
    }
}

impl EventLogger for RecordingEventLogger {
    fn log(
        &self,
        reason: ControllerReason,
        message: &str,
        severity: EventSeverity,
        kind: ControllerKind,
        subject: &str,
    ) {
        lock(&self.events).push(ControllerEvent::new(reason, message, severity, kind, subject));
    }
}

// =============================================================================
// Address store
// =============================================================================

/// Address store backed by a map keyed by address string.
#[derive(Debug, Default)]
pub struct InMemoryAddressApi {
    addresses: Mutex<BTreeMap<String, Address>>,
    fail_replace: Mutex<BTreeSet<String>>,
    writes: Mutex<Vec<String>>,
}

impl InMemoryAddressApi {
    pub fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
        let api = Self::default();
        for address in addresses {
            api.put(address);
        }
        api
    }

    /// Insert or overwrite an address without recording a write.
    pub fn put(&self, address: Address) {
        lock(&self.addresses).insert(address.address.clone(), address);
    }

    pub fn get(&self, address: &str) -> Option<Address> {
        lock(&self.addresses).get(address).cloned()
    }

    /// Make `replace_address` fail for an address string.
    pub fn fail_replace(&self, address: &str) {
        lock(&self.fail_replace).insert(address.to_string());
    }

    /// Address strings written through `replace_address`, in call order.
    pub fn writes(&self) -> Vec<String> {
        lock(&self.writes).clone()
    }
}

#[async_trait]
impl AddressApi for InMemoryAddressApi {
    async fn list_addresses(&self) -> Result<Vec<Address>, ClientError> {
        Ok(lock(&self.addresses).values().cloned().collect())
    }

    async fn replace_address(&self, address: &Address) -> Result<(), ClientError> {
        if lock(&self.fail_replace).contains(&address.address) {
            return Err(ClientError::Api(format!(
                "conflict replacing {}",
                address.address
            )));
        }
        let mut addresses = lock(&self.addresses);
        if !addresses.contains_key(&address.address) {
            return Err(ClientError::NotFound(format!("address {}", address.address)));
        }
        addresses.insert(address.address.clone(), address.clone());
        lock(&self.writes).push(address.address.clone());
        Ok(())
    }
}
