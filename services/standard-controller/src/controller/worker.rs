//! Controller background worker.
//!
//! Runs the reconcile pass on a periodic interval.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, instrument};

use super::reconciler::{AddressController, ReconcileStats};

/// Worker that runs [`AddressController::reconcile_once`] until shutdown.
pub struct ControllerWorker {
    controller: AddressController,
    interval: Duration,
}

impl ControllerWorker {
    pub fn new(controller: AddressController, interval: Duration) -> Self {
        Self {
            controller,
            interval,
        }
    }

    /// Run passes until `shutdown` becomes `true`.
    ///
    /// The first pass runs immediately. A failed pass is logged and retried
    /// on the next tick.
    #[instrument(skip(self, shutdown), fields(address_space = %self.controller.address_space()))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting controller worker"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_reconciliation().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Controller worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Run a single pass, returning its statistics if it completed.
    pub async fn run_reconciliation(&self) -> Option<ReconcileStats> {
        match self.controller.reconcile_once().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!(error = %e, "Reconcile pass failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use fleet_model::{Address, AddressApi, ClientError};
    use fleet_testing::{
        queue, standard_schema, FakeClusterGenerator, FakeKubernetes, InMemoryAddressApi,
        ADDRESS_SPACE,
    };

    use crate::controller::Collaborators;

    struct UnavailableAddressApi;

    #[async_trait]
    impl AddressApi for UnavailableAddressApi {
        async fn list_addresses(&self) -> Result<Vec<Address>, ClientError> {
            Err(ClientError::Api("address store unavailable".to_string()))
        }

        async fn replace_address(&self, _address: &Address) -> Result<(), ClientError> {
            Err(ClientError::Api("address store unavailable".to_string()))
        }
    }

    fn worker(addresses: Arc<dyn AddressApi>) -> ControllerWorker {
        let collaborators = Collaborators::new(
            addresses,
            Arc::new(FakeKubernetes::new()),
            Arc::new(FakeClusterGenerator::new()),
        );
        let controller =
            AddressController::from_schema(ADDRESS_SPACE, standard_schema(), collaborators);
        ControllerWorker::new(controller, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_failed_pass_is_not_propagated() {
        let worker = worker(Arc::new(UnavailableAddressApi));
        assert!(worker.run_reconciliation().await.is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let api = Arc::new(InMemoryAddressApi::new([queue("q1", "small-queue")]));
        let worker = worker(api.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
        assert_eq!(api.get("q1").unwrap().phase(), fleet_model::Phase::Configuring);
    }
}
