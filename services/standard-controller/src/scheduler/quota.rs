//! Quota scheduler.
//!
//! Pending addresses are processed in three groups:
//! 1. Subscriptions whose topic is already `Configuring` or `Active`
//! 2. Subscriptions whose topic is still `Pending`: the topic is admitted
//!    first, then every subscription it unblocks
//! 3. Every remaining non-subscription address
//!
//! Within a group addresses are taken in address-string order, which makes
//! a pass deterministic.

use std::collections::BTreeSet;
use std::sync::Arc;

use fleet_id::{
    is_pooled_broker, is_shard_of, pooled_broker_id, pooled_cluster_id, shard_broker_id,
    sharded_cluster_id, BrokerId, ROUTER_INSTANCE,
};
use fleet_model::{Address, AddressSet, Phase, PlanResolver};
use tracing::{debug, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};
use super::placement::{
    by_credit, first_fit, Admission, Limits, Placement, PlacementFailure, PlacementStrategy,
    BROKER_CAPACITY,
};
use crate::usage::{ResourceKind, UsageModel};

/// Status message appended to addresses rejected for quota.
pub const QUOTA_EXCEEDED_MESSAGE: &str = "Quota exceeded";

/// Why an address was left `Pending`.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    QuotaExceeded {
        resource: String,
        needed: u32,
        limit: f64,
    },
    PlacementFailed(PlacementFailure),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded {
                resource,
                needed,
                limit,
            } => write!(f, "{QUOTA_EXCEEDED_MESSAGE} for {resource}: needed {needed} > limit {limit}"),
            Self::PlacementFailed(reason) => write!(f, "{reason}"),
        }
    }
}

/// A pending address that was not admitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub address: String,
    pub reason: RejectReason,
}

/// Result of a scheduling pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleOutcome {
    /// Committed usage after every admission.
    pub usage: UsageModel,
    /// Admitted addresses, in admission order.
    pub admitted: Vec<String>,
    pub rejected: Vec<Rejection>,
}

/// The admission algorithm.
pub struct QuotaScheduler {
    resolver: Arc<dyn PlanResolver>,
    limits: Limits,
}

impl QuotaScheduler {
    pub fn new(resolver: Arc<dyn PlanResolver>, limits: Limits) -> Self {
        Self { resolver, limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Admit the `pending` addresses of `all` on top of `usage`.
    ///
    /// Admitted addresses get placement annotations and the `Configuring`
    /// phase; rejected ones are set `Pending` with a status message. Only a
    /// conflicting sharded cluster id aborts the pass.
    #[instrument(skip_all, fields(pending = pending.len()))]
    pub fn schedule(
        &self,
        usage: &UsageModel,
        pending: &BTreeSet<String>,
        all: &mut AddressSet,
    ) -> SchedulerResult<ScheduleOutcome> {
        let mut outcome = ScheduleOutcome {
            usage: usage.clone(),
            ..ScheduleOutcome::default()
        };

        let mut ready = BTreeSet::new();
        let mut waiting = BTreeSet::new();
        let mut others = BTreeSet::new();
        for key in pending {
            let Some(address) = all.get(key) else {
                warn!(address = %key, "Pending address not in address set");
                continue;
            };
            if !address.is_subscription() {
                others.insert(key.clone());
                continue;
            }
            match all.topic_of(address).map(Address::phase) {
                Some(phase) if phase.is_admitted() => {
                    ready.insert(key.clone());
                }
                Some(Phase::Pending) => {
                    waiting.insert(key.clone());
                }
                Some(phase) => {
                    debug!(address = %key, topic_phase = %phase, "Leaving subscription of unschedulable topic");
                }
                // Placement reports the missing topic.
                None => {
                    ready.insert(key.clone());
                }
            }
        }

        for key in &ready {
            self.admit(&mut outcome, key, all)?;
        }

        while let Some(first) = waiting.pop_first() {
            let Some(topic) = all.get(&first).and_then(|a| a.topic.clone()) else {
                continue;
            };
            self.admit(&mut outcome, &topic, all)?;
            others.remove(&topic);

            let unblocked: Vec<String> = std::iter::once(first)
                .chain(waiting.iter().cloned())
                .filter(|key| topic_admitted(all, key))
                .collect();
            for key in &unblocked {
                self.admit(&mut outcome, key, all)?;
                waiting.remove(key);
            }
            // Subscriptions of a rejected topic stay pending until a later pass.
            waiting.retain(|key| all.get(key).and_then(|a| a.topic.as_deref()) != Some(topic.as_str()));
        }

        for key in &others {
            self.admit(&mut outcome, key, all)?;
        }

        info!(
            admitted = outcome.admitted.len(),
            rejected = outcome.rejected.len(),
            "Scheduling pass complete"
        );
        Ok(outcome)
    }

    /// Check one address and apply the result to it.
    fn admit(
        &self,
        outcome: &mut ScheduleOutcome,
        key: &str,
        all: &mut AddressSet,
    ) -> SchedulerResult<()> {
        let admission = match all.get(key) {
            Some(address) if !address.phase().is_admitted() => {
                self.check_quota_for_address(&outcome.usage, address, all)?
            }
            _ => return Ok(()),
        };
        let Some(address) = all.get_mut(key) else {
            return Ok(());
        };

        match admission {
            Admission::Committed { usage, placement } => {
                placement.apply_to(address);
                address.status.set_phase(Phase::Configuring);
                debug!(
                    address = %key,
                    cluster_id = ?placement.cluster_id,
                    broker_id = ?placement.broker_id,
                    "Address admitted"
                );
                outcome.usage = usage;
                outcome.admitted.push(key.to_string());
            }
            Admission::QuotaExceeded {
                resource,
                needed,
                limit,
            } => {
                info!(address = %key, resource = %resource, needed, limit, "Quota exceeded");
                address
                    .status
                    .set_phase(Phase::Pending)
                    .append_message(QUOTA_EXCEEDED_MESSAGE);
                outcome.rejected.push(Rejection {
                    address: key.to_string(),
                    reason: RejectReason::QuotaExceeded {
                        resource,
                        needed,
                        limit,
                    },
                });
            }
            Admission::PlacementFailed { reason } => {
                warn!(address = %key, reason = %reason, "Unable to place address");
                address
                    .status
                    .set_phase(Phase::Pending)
                    .append_message(reason.to_string());
                outcome.rejected.push(Rejection {
                    address: key.to_string(),
                    reason: RejectReason::PlacementFailed(reason),
                });
            }
        }
        Ok(())
    }

    /// Check whether `address` fits on top of `usage`.
    ///
    /// Works on a copy of `usage`; nothing is modified unless the caller
    /// applies a [`Admission::Committed`] result.
    pub fn check_quota_for_address(
        &self,
        usage: &UsageModel,
        address: &Address,
        all: &AddressSet,
    ) -> SchedulerResult<Admission> {
        let plan = match self.resolver.plan_for(address) {
            Ok(plan) => plan,
            Err(e) => {
                return Ok(Admission::PlacementFailed {
                    reason: PlacementFailure::from(e),
                })
            }
        };

        let mut needed = usage.clone();
        let mut placement = Placement::default();

        for request in &plan.resources {
            let amount = request.amount;
            let strategy = ResourceKind::from_name(&request.resource_name)
                .and_then(|kind| Some((kind, PlacementStrategy::select(kind, address, amount)?)));
            let Some((kind, strategy)) = strategy else {
                warn!(
                    address = %address.address,
                    resource = %request.resource_name,
                    "Ignoring unschedulable resource in plan"
                );
                continue;
            };

            let placed = match strategy {
                PlacementStrategy::Router => {
                    needed.add_used(ResourceKind::Router, ROUTER_INSTANCE, amount);
                    Ok(())
                }
                PlacementStrategy::Subscription => {
                    place_subscription(&mut needed, &mut placement, address, all, amount)
                }
                PlacementStrategy::Pooled => place_pooled(&mut needed, &mut placement, amount),
                PlacementStrategy::Sharded => {
                    place_sharded(&mut needed, &mut placement, address, amount)?
                }
            };
            if let Err(reason) = placed {
                return Ok(Admission::PlacementFailed { reason });
            }

            let resource_needed = needed.sum_needed(kind);
            let limit = self.limits.limit(kind);
            if f64::from(resource_needed) > limit {
                return Ok(Admission::QuotaExceeded {
                    resource: kind.to_string(),
                    needed: resource_needed,
                    limit,
                });
            }
        }

        let total_needed = needed.total_needed();
        debug!(address = %address.address, total_needed, aggregate = self.limits.aggregate(), "Checked address");
        if f64::from(total_needed) > self.limits.aggregate() {
            return Ok(Admission::QuotaExceeded {
                resource: fleet_model::AGGREGATE_ALLOWANCE.to_string(),
                needed: total_needed,
                limit: self.limits.aggregate(),
            });
        }

        Ok(Admission::Committed {
            usage: needed,
            placement,
        })
    }
}

fn topic_admitted(all: &AddressSet, subscription: &str) -> bool {
    all.get(subscription)
        .and_then(|s| all.topic_of(s))
        .is_some_and(|t| t.phase().is_admitted())
}

fn parse_broker_id(id: &str) -> Result<BrokerId, PlacementFailure> {
    BrokerId::parse(id).map_err(|_| PlacementFailure::InvalidBrokerId(id.to_string()))
}

/// Place a subscription next to its topic.
///
/// A pooled topic's subscriptions share the topic's broker, which may be
/// filled up to exactly its capacity. A sharded topic's subscriptions are
/// spread over `<cluster>-<n>` shards, at most one shard per replica.
fn place_subscription(
    needed: &mut UsageModel,
    placement: &mut Placement,
    subscription: &Address,
    all: &AddressSet,
    amount: f64,
) -> Result<(), PlacementFailure> {
    let topic_name = subscription
        .topic
        .as_deref()
        .ok_or(PlacementFailure::MissingTopic)?;
    let topic = all
        .get(topic_name)
        .ok_or_else(|| PlacementFailure::TopicNotFound(topic_name.to_string()))?;
    let cluster_id = topic
        .cluster_id()
        .ok_or_else(|| PlacementFailure::TopicNotPlaced(topic_name.to_string()))?;

    let broker_id = if let Some(broker) = topic.broker_id() {
        let used = needed
            .get(ResourceKind::Subscription, broker.as_str())
            .map_or(0.0, |info| info.used());
        if used + amount > BROKER_CAPACITY {
            info!(broker = %broker, subscription = %subscription.address, topic = %topic_name, "No quota available on broker");
            return Err(PlacementFailure::BrokerFull {
                broker: broker.clone(),
                topic: topic_name.to_string(),
            });
        }
        broker.clone()
    } else {
        let replicas = needed
            .get(ResourceKind::Broker, cluster_id.as_str())
            .map_or(0, |info| info.needed()) as usize;
        let mut shards = by_credit(needed.resource(ResourceKind::Subscription), |id| {
            is_shard_of(id, cluster_id)
        });
        if shards.len() < replicas {
            let next = (0..)
                .map(|index| shard_broker_id(cluster_id, index))
                .find(|id| !shards.iter().any(|(s, _)| s == id.as_str()))
                .map(BrokerId::into_string);
            if let Some(next) = next {
                shards.insert(0, (next, 0.0));
            }
        }
        let shard = first_fit(&shards, amount).ok_or_else(|| PlacementFailure::NoShardCapacity {
            cluster_id: cluster_id.clone(),
            topic: topic_name.to_string(),
        })?;
        parse_broker_id(shard)?
    };

    needed.add_used(ResourceKind::Subscription, broker_id.as_str(), amount);
    placement.cluster_id = Some(cluster_id.clone());
    placement.broker_id = Some(broker_id);
    Ok(())
}

/// Bin-pack onto the pooled brokers, allocating one more broker if none has
/// room.
fn place_pooled(
    needed: &mut UsageModel,
    placement: &mut Placement,
    amount: f64,
) -> Result<(), PlacementFailure> {
    let pooled_fit = |needed: &UsageModel| {
        let candidates = by_credit(needed.resource(ResourceKind::Broker), is_pooled_broker);
        first_fit(&candidates, amount).map(str::to_string)
    };

    let broker = match pooled_fit(&*needed) {
        Some(broker) => broker,
        None => {
            let allocated = allocate_pooled_broker(needed);
            debug!(broker = %allocated, "Allocated pooled broker");
            pooled_fit(&*needed).ok_or(PlacementFailure::NoPooledCapacity)?
        }
    };

    needed.add_used(ResourceKind::Broker, &broker, amount);
    placement.cluster_id = Some(pooled_cluster_id());
    placement.broker_id = Some(parse_broker_id(&broker)?);
    Ok(())
}

/// Add an empty pooled broker named after the current pooled broker count,
/// skipping ids already in use.
fn allocate_pooled_broker(needed: &mut UsageModel) -> BrokerId {
    let usage = needed.resource_mut(ResourceKind::Broker);
    let count = usage.keys().filter(|id| is_pooled_broker(id)).count();
    let mut index = count;
    while usage.contains_key(pooled_broker_id(index).as_str()) {
        index += 1;
    }
    let id = pooled_broker_id(index);
    usage.insert(id.to_string(), Default::default());
    id
}

/// Claim the address's dedicated cluster.
///
/// The cluster must not already carry usage: its id is derived from the
/// address alone, so existing usage means the id was claimed twice.
fn place_sharded(
    needed: &mut UsageModel,
    placement: &mut Placement,
    address: &Address,
    amount: f64,
) -> SchedulerResult<Result<(), PlacementFailure>> {
    let cluster_id = sharded_cluster_id(&address.name, &address.address);
    if needed.contains(ResourceKind::Broker, cluster_id.as_str()) {
        return Err(SchedulerError::ConflictingUsage {
            address: address.address.clone(),
            cluster_id,
        });
    }
    needed.add_used(ResourceKind::Broker, cluster_id.as_str(), amount);

    let brokers = by_credit(needed.resource(ResourceKind::Broker), |id| {
        id == cluster_id.as_str() || is_shard_of(id, &cluster_id)
    });
    match first_fit(&brokers, amount) {
        Some(broker) => match parse_broker_id(broker) {
            Ok(broker) => placement.broker_id = Some(broker),
            Err(e) => return Ok(Err(e)),
        },
        None => debug!(cluster_id = %cluster_id, address = %address.address, "Not enough credit on sharded brokers"),
    }

    placement.cluster_id = Some(cluster_id);
    Ok(Ok(()))
}
