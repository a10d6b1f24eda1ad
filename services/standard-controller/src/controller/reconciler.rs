//! Address controller reconciler.

use std::collections::BTreeSet;
use std::sync::Arc;

use fleet_events::{
    ControllerKind, ControllerReason, EventLogger, EventSeverity, TracingEventLogger,
};
use fleet_model::{
    AddressApi, AddressSet, ClientError, ClusterGenerator, Kubernetes, Phase, PlanResolver,
    StandardSchema,
};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::provision::ClusterProvisioner;
use crate::scheduler::{Limits, QuotaScheduler, RejectReason, SchedulerError};
use crate::usage::UsageComputer;

/// Faults that abort a reconcile pass.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("failed to list addresses: {0}")]
    ListAddresses(#[source] ClientError),

    #[error("failed to list clusters: {0}")]
    ListClusters(#[source] ClientError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Effectful collaborators of the controller.
#[derive(Clone)]
pub struct Collaborators {
    pub addresses: Arc<dyn AddressApi>,
    pub kubernetes: Arc<dyn Kubernetes>,
    pub generator: Arc<dyn ClusterGenerator>,
    pub events: Arc<dyn EventLogger>,
}

impl Collaborators {
    /// Collaborators that report events through `tracing`.
    pub fn new(
        addresses: Arc<dyn AddressApi>,
        kubernetes: Arc<dyn Kubernetes>,
        generator: Arc<dyn ClusterGenerator>,
    ) -> Self {
        Self {
            addresses,
            kubernetes,
            generator,
            events: Arc::new(TracingEventLogger),
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventLogger>) -> Self {
        self.events = events;
        self
    }
}

/// Statistics from a reconcile pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileStats {
    pub addresses: usize,
    pub pending: usize,
    pub admitted: usize,
    pub rejected: usize,
    pub clusters_created: usize,
    pub clusters_failed: usize,
    pub scale_failed: usize,
    pub written: usize,
    pub write_failed: usize,
}

/// Drives one address space through usage, scheduling and provisioning.
pub struct AddressController {
    address_space: String,
    collaborators: Collaborators,
    computer: UsageComputer,
    scheduler: QuotaScheduler,
    provisioner: ClusterProvisioner,
}

impl AddressController {
    pub fn new(
        address_space: impl Into<String>,
        resolver: Arc<dyn PlanResolver>,
        limits: Limits,
        collaborators: Collaborators,
    ) -> Self {
        let provisioner = ClusterProvisioner::new(
            resolver.clone(),
            collaborators.generator.clone(),
            collaborators.kubernetes.clone(),
            collaborators.events.clone(),
        );
        Self {
            address_space: address_space.into(),
            computer: UsageComputer::new(resolver.clone()),
            scheduler: QuotaScheduler::new(resolver, limits),
            provisioner,
            collaborators,
        }
    }

    /// Controller whose limits come from the schema's address space plan.
    pub fn from_schema(
        address_space: impl Into<String>,
        schema: StandardSchema,
        collaborators: Collaborators,
    ) -> Self {
        let limits = Limits::from_plan(schema.address_space_plan());
        Self::new(address_space, Arc::new(schema), limits, collaborators)
    }

    pub fn address_space(&self) -> &str {
        &self.address_space
    }

    /// Run a single reconcile pass.
    #[instrument(skip(self), fields(address_space = %self.address_space))]
    pub async fn reconcile_once(&self) -> Result<ReconcileStats, ControllerError> {
        let mut stats = ReconcileStats::default();

        let listed = self
            .collaborators
            .addresses
            .list_addresses()
            .await
            .map_err(ControllerError::ListAddresses)?;
        let observed: AddressSet = listed
            .into_iter()
            .filter(|a| a.address_space == self.address_space)
            .collect();
        stats.addresses = observed.len();

        let mut addresses = observed.clone();
        // Messages of pending addresses describe the latest pass only.
        for address in addresses.iter_mut().filter(|a| a.phase() == Phase::Pending) {
            address.status.clear_messages();
        }

        let usage = self
            .computer
            .compute_usage(addresses.iter().filter(|a| a.phase().is_admitted()));

        let pending: BTreeSet<String> = addresses
            .iter()
            .filter(|a| a.phase() == Phase::Pending)
            .map(|a| a.address.clone())
            .collect();
        stats.pending = pending.len();
        debug!(addresses = stats.addresses, pending = stats.pending, "Listed addresses");

        let outcome = self.scheduler.schedule(&usage, &pending, &mut addresses)?;
        stats.admitted = outcome.admitted.len();
        stats.rejected = outcome.rejected.len();
        for rejection in &outcome.rejected {
            let reason = match rejection.reason {
                RejectReason::QuotaExceeded { .. } => ControllerReason::QuotaExceeded,
                RejectReason::PlacementFailed(_) => ControllerReason::PlacementFailed,
            };
            self.collaborators.events.log(
                reason,
                &rejection.reason.to_string(),
                EventSeverity::Warning,
                ControllerKind::Address,
                &rejection.address,
            );
        }

        let kubernetes = &self.collaborators.kubernetes;
        let mut router = kubernetes
            .list_router_cluster()
            .await
            .map_err(ControllerError::ListClusters)?;
        let mut brokers = kubernetes
            .list_broker_clusters()
            .await
            .map_err(ControllerError::ListClusters)?;

        let provision = self
            .provisioner
            .apply(&outcome.usage, &mut router, &mut brokers, &mut addresses)
            .await;
        stats.clusters_created = provision.clusters_created;
        stats.clusters_failed = provision.clusters_failed;
        stats.scale_failed = provision.scale_failed;

        for address in addresses.iter() {
            if observed.get(&address.address) == Some(address) {
                continue;
            }
            match self.collaborators.addresses.replace_address(address).await {
                Ok(()) => stats.written += 1,
                Err(e) => {
                    warn!(address = %address.address, error = %e, "Failed to write address");
                    stats.write_failed += 1;
                }
            }
        }

        info!(
            addresses = stats.addresses,
            admitted = stats.admitted,
            rejected = stats.rejected,
            clusters_created = stats.clusters_created,
            written = stats.written,
            "Reconcile pass complete"
        );

        Ok(stats)
    }
}
