//! Router and broker deployment handles.

use fleet_id::ClusterId;
use serde::{Deserialize, Serialize};

/// Deployable manifests produced by the cluster generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceBundle {
    pub items: Vec<serde_json::Value>,
}

impl ResourceBundle {
    pub fn new(items: Vec<serde_json::Value>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The router deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterCluster {
    pub name: String,
    replicas: u32,
    new_replicas: u32,
}

impl RouterCluster {
    pub fn new(name: impl Into<String>, replicas: u32) -> Self {
        Self {
            name: name.into(),
            replicas,
            new_replicas: replicas,
        }
    }

    pub fn replicas(&self) -> u32 {
        self.replicas
    }

    pub fn new_replicas(&self) -> u32 {
        self.new_replicas
    }

    pub fn set_new_replicas(&mut self, replicas: u32) {
        self.new_replicas = replicas;
    }

    pub fn has_changed(&self) -> bool {
        self.replicas != self.new_replicas
    }
}

/// A broker cluster: the pooled `broker` cluster or one sharded cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerCluster {
    pub cluster_id: ClusterId,
    pub resources: ResourceBundle,
    replicas: u32,
    new_replicas: u32,
}

impl BrokerCluster {
    pub fn new(cluster_id: ClusterId, replicas: u32, resources: ResourceBundle) -> Self {
        Self {
            cluster_id,
            resources,
            replicas,
            new_replicas: replicas,
        }
    }

    pub fn replicas(&self) -> u32 {
        self.replicas
    }

    pub fn new_replicas(&self) -> u32 {
        self.new_replicas
    }

    pub fn set_new_replicas(&mut self, replicas: u32) {
        self.new_replicas = replicas;
    }

    pub fn has_changed(&self) -> bool {
        self.replicas != self.new_replicas
    }
}
