//! Usage snapshot of admitted addresses.

use std::sync::Arc;

use fleet_id::{sharded_cluster_id, ROUTER_INSTANCE};
use fleet_model::{Address, PlanResolver};
use tracing::{debug, warn};

use super::{ResourceKind, UsageModel};

/// Builds a [`UsageModel`] from addresses that already hold placements.
pub struct UsageComputer {
    resolver: Arc<dyn PlanResolver>,
}

impl UsageComputer {
    pub fn new(resolver: Arc<dyn PlanResolver>) -> Self {
        Self { resolver }
    }

    /// Compute the usage of `addresses`.
    ///
    /// An address whose plan cannot be resolved, or that lacks the broker id
    /// its usage is keyed by, is skipped as a whole with a warning. Inputs
    /// are never modified.
    pub fn compute_usage<'a>(&self, addresses: impl IntoIterator<Item = &'a Address>) -> UsageModel {
        let mut usage = UsageModel::new();
        for address in addresses {
            if let Some(entries) = self.address_usage(address) {
                for (kind, instance, amount) in entries {
                    usage.add_used(kind, &instance, amount);
                }
            }
        }
        debug!(kinds = usage.kinds().count(), "Computed usage");
        usage
    }

    /// Usage entries of one address, or `None` if it must be skipped.
    fn address_usage(&self, address: &Address) -> Option<Vec<(ResourceKind, String, f64)>> {
        let plan = match self.resolver.plan_for(address) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(address = %address.address, error = %e, "Skipping address with unresolvable plan");
                return None;
            }
        };

        let mut entries = Vec::with_capacity(plan.resources.len());
        for request in &plan.resources {
            let Some(kind) = ResourceKind::from_name(&request.resource_name) else {
                warn!(
                    address = %address.address,
                    resource = %request.resource_name,
                    "Ignoring unknown resource in plan"
                );
                continue;
            };

            let (kind, instance) = match kind {
                ResourceKind::Router => (kind, ROUTER_INSTANCE.to_string()),
                ResourceKind::Broker if address.is_subscription() => {
                    (ResourceKind::Subscription, broker_id_of(address)?)
                }
                ResourceKind::Broker if request.amount < 1.0 => (kind, broker_id_of(address)?),
                ResourceKind::Broker => (
                    kind,
                    sharded_cluster_id(&address.name, &address.address).into_string(),
                ),
                ResourceKind::Subscription => {
                    warn!(address = %address.address, "Ignoring subscription resource requested by plan");
                    continue;
                }
            };
            entries.push((kind, instance, request.amount));
        }
        Some(entries)
    }
}

fn broker_id_of(address: &Address) -> Option<String> {
    match address.broker_id() {
        Some(id) => Some(id.to_string()),
        None => {
            warn!(address = %address.address, "Unexpected pooled address without broker id");
            None
        }
    }
}
