//! Contracts of the effectful collaborators: cluster generation, the
//! cluster API and the address store.

use async_trait::async_trait;
use fleet_id::ClusterId;
use thiserror::Error;

use crate::{Address, BrokerCluster, ResourceBundle, ResourceDefinition, RouterCluster};

/// Errors reported by collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The cluster API rejected or failed a request.
    #[error("api error: {0}")]
    Api(String),

    /// A cluster specification could not be generated.
    #[error("template error: {0}")]
    Template(String),

    /// The requested object does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Turns an allocation decision into a deployable cluster specification.
pub trait ClusterGenerator: Send + Sync {
    /// Generate a cluster with `replicas` replicas.
    ///
    /// `address` is the owning address for sharded clusters and `None` for
    /// the pooled cluster. A returned cluster with an empty resource bundle
    /// means there is nothing to create.
    fn generate_cluster(
        &self,
        cluster_id: &ClusterId,
        definition: &ResourceDefinition,
        replicas: u32,
        address: Option<&Address>,
    ) -> Result<BrokerCluster, ClientError>;
}

/// The cluster API.
#[async_trait]
pub trait Kubernetes: Send + Sync {
    async fn list_router_cluster(&self) -> Result<RouterCluster, ClientError>;

    async fn list_broker_clusters(&self) -> Result<Vec<BrokerCluster>, ClientError>;

    async fn create(&self, resources: &ResourceBundle) -> Result<(), ClientError>;

    async fn scale_deployment(&self, name: &str, replicas: u32) -> Result<(), ClientError>;

    async fn scale_stateful_set(
        &self,
        cluster_id: &ClusterId,
        replicas: u32,
    ) -> Result<(), ClientError>;
}

/// The address store of one address space.
#[async_trait]
pub trait AddressApi: Send + Sync {
    async fn list_addresses(&self) -> Result<Vec<Address>, ClientError>;

    async fn replace_address(&self, address: &Address) -> Result<(), ClientError>;
}
