//! Cluster provisioner.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use fleet_events::{ControllerKind, ControllerReason, EventLogger, EventSeverity};
use fleet_id::{is_pooled_broker, pooled_cluster_id, ClusterId};
use fleet_model::{
    Address, AddressSet, BrokerCluster, ClientError, ClusterGenerator, Kubernetes, Phase,
    PlanResolver, ResourceDefinition, RouterCluster,
};
use tracing::{debug, info, instrument, warn};

use crate::usage::{ResourceKind, UsageModel};

/// Summary of one provisioning pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProvisionStats {
    pub clusters_created: usize,
    pub clusters_failed: usize,
    pub scaled: usize,
    pub scale_failed: usize,
    /// Existing broker clusters no usage refers to. They are left in place.
    pub unreferenced: Vec<ClusterId>,
}

/// Applies a usage model to the router and broker clusters.
pub struct ClusterProvisioner {
    resolver: Arc<dyn PlanResolver>,
    generator: Arc<dyn ClusterGenerator>,
    kubernetes: Arc<dyn Kubernetes>,
    events: Arc<dyn EventLogger>,
}

impl ClusterProvisioner {
    pub fn new(
        resolver: Arc<dyn PlanResolver>,
        generator: Arc<dyn ClusterGenerator>,
        kubernetes: Arc<dyn Kubernetes>,
        events: Arc<dyn EventLogger>,
    ) -> Self {
        Self {
            resolver,
            generator,
            kubernetes,
            events,
        }
    }

    /// Provision and scale clusters for `usage`.
    ///
    /// Clusters missing from `brokers` are generated, created and appended.
    /// A failed creation sets the owning address `Failed`; a failed scale
    /// call is logged. Neither stops the remaining clusters.
    #[instrument(skip_all, fields(brokers = brokers.len()))]
    pub async fn apply(
        &self,
        usage: &UsageModel,
        router: &mut RouterCluster,
        brokers: &mut Vec<BrokerCluster>,
        addresses: &mut AddressSet,
    ) -> ProvisionStats {
        let mut stats = ProvisionStats::default();
        let mut referenced = BTreeSet::new();

        if usage.resource(ResourceKind::Router).is_some() {
            router.set_new_replicas(usage.sum_needed(ResourceKind::Router));
        }

        if usage.resource(ResourceKind::Broker).is_some() {
            let pooled = usage.sum_needed_matching(ResourceKind::Broker, is_pooled_broker);
            if pooled > 0 {
                let cluster_id = pooled_cluster_id();
                referenced.insert(cluster_id.clone());
                match self
                    .resolver
                    .resolve_resource_definition(ResourceKind::Broker.as_str())
                {
                    Ok(definition) => {
                        self.provision_broker(brokers, &cluster_id, definition, pooled, None, &mut stats)
                            .await;
                    }
                    Err(e) => self.creation_failed(&cluster_id, &e, None, &mut stats),
                }
            }

            for (cluster_id, replicas, owner) in sharded_clusters(usage, addresses) {
                referenced.insert(cluster_id.clone());
                let definition = addresses.get(&owner).map(|address| {
                    self.resolver.plan_for(address).and_then(|plan| {
                        self.resolver
                            .resolve_plan_resource_definition(plan, ResourceKind::Broker.as_str())
                    })
                });
                let address = addresses.get_mut(&owner);
                match definition {
                    Some(Ok(definition)) => {
                        self.provision_broker(
                            brokers,
                            &cluster_id,
                            definition,
                            replicas,
                            address,
                            &mut stats,
                        )
                        .await;
                    }
                    Some(Err(e)) => self.creation_failed(&cluster_id, &e, address, &mut stats),
                    None => {}
                }
            }
        }

        self.scale(router, brokers, &mut stats).await;

        stats.unreferenced = brokers
            .iter()
            .map(|b| b.cluster_id.clone())
            .filter(|id| !referenced.contains(id))
            .collect();
        if !stats.unreferenced.is_empty() {
            info!(
                clusters = ?stats.unreferenced,
                "Broker clusters without usage left for separate cleanup"
            );
        }

        stats
    }

    /// Scale an existing cluster, or generate and create a new one.
    async fn provision_broker(
        &self,
        brokers: &mut Vec<BrokerCluster>,
        cluster_id: &ClusterId,
        definition: &ResourceDefinition,
        replicas: u32,
        address: Option<&mut Address>,
        stats: &mut ProvisionStats,
    ) {
        if let Some(existing) = brokers.iter_mut().find(|b| &b.cluster_id == cluster_id) {
            debug!(cluster_id = %cluster_id, replicas, "Broker cluster exists");
            existing.set_new_replicas(replicas);
            return;
        }

        match self
            .create_broker(cluster_id, definition, replicas, address.as_deref())
            .await
        {
            Ok(cluster) => {
                stats.clusters_created += 1;
                brokers.push(cluster);
            }
            Err(e) => self.creation_failed(cluster_id, &e, address, stats),
        }
    }

    async fn create_broker(
        &self,
        cluster_id: &ClusterId,
        definition: &ResourceDefinition,
        replicas: u32,
        address: Option<&Address>,
    ) -> Result<BrokerCluster, ClientError> {
        let cluster = self
            .generator
            .generate_cluster(cluster_id, definition, replicas, address)?;
        if !cluster.resources.is_empty() {
            self.kubernetes.create(&cluster.resources).await?;
            info!(cluster_id = %cluster.cluster_id, replicas, "Created broker cluster");
            self.events.log(
                ControllerReason::BrokerCreated,
                &format!("Created broker {} with {replicas} replicas", cluster.cluster_id),
                EventSeverity::Normal,
                ControllerKind::Broker,
                cluster.cluster_id.as_str(),
            );
        }
        Ok(cluster)
    }

    fn creation_failed(
        &self,
        cluster_id: &ClusterId,
        error: &dyn std::error::Error,
        address: Option<&mut Address>,
        stats: &mut ProvisionStats,
    ) {
        let message = format!("Error creating broker: {error}");
        warn!(cluster_id = %cluster_id, error = %error, "Error creating broker");
        self.events.log(
            ControllerReason::BrokerCreateFailed,
            &message,
            EventSeverity::Warning,
            ControllerKind::Broker,
            cluster_id.as_str(),
        );
        if let Some(address) = address {
            address.status.set_phase(Phase::Failed).append_message(message);
        }
        stats.clusters_failed += 1;
    }

    /// Issue scale calls for every cluster whose replica count changed.
    async fn scale(
        &self,
        router: &RouterCluster,
        brokers: &[BrokerCluster],
        stats: &mut ProvisionStats,
    ) {
        if router.has_changed() {
            info!(replicas = router.new_replicas(), "Scaling router");
            match self
                .kubernetes
                .scale_deployment(&router.name, router.new_replicas())
                .await
            {
                Ok(()) => stats.scaled += 1,
                Err(e) => self.scale_failed(ControllerKind::Router, &router.name, &e, stats),
            }
        }

        for cluster in brokers.iter().filter(|b| b.has_changed()) {
            info!(
                cluster_id = %cluster.cluster_id,
                replicas = cluster.new_replicas(),
                "Scaling broker cluster"
            );
            match self
                .kubernetes
                .scale_stateful_set(&cluster.cluster_id, cluster.new_replicas())
                .await
            {
                Ok(()) => stats.scaled += 1,
                Err(e) => self.scale_failed(
                    ControllerKind::Broker,
                    cluster.cluster_id.as_str(),
                    &e,
                    stats,
                ),
            }
        }
    }

    fn scale_failed(
        &self,
        kind: ControllerKind,
        subject: &str,
        error: &ClientError,
        stats: &mut ProvisionStats,
    ) {
        warn!(kind = %kind, subject, error = %error, "Error scaling cluster");
        self.events.log(
            ControllerReason::ScaleFailed,
            &format!("Error scaling {subject}: {error}"),
            EventSeverity::Warning,
            kind,
            subject,
        );
        stats.scale_failed += 1;
    }
}

/// Sharded broker usage entries that belong to a non-subscription address,
/// as `(cluster id, replicas, owning address)`.
fn sharded_clusters(usage: &UsageModel, addresses: &AddressSet) -> Vec<(ClusterId, u32, String)> {
    let mut owners: BTreeMap<&str, (&ClusterId, &str)> = BTreeMap::new();
    for address in addresses.iter().filter(|a| !a.is_subscription()) {
        if let Some(cluster_id) = address.cluster_id() {
            owners
                .entry(cluster_id.as_str())
                .or_insert((cluster_id, address.address.as_str()));
        }
    }

    usage
        .resource(ResourceKind::Broker)
        .into_iter()
        .flatten()
        .filter_map(|(instance, info)| {
            let (cluster_id, owner) = owners.get(instance.as_str())?;
            Some(((*cluster_id).clone(), info.needed(), owner.to_string()))
        })
        .collect()
}
