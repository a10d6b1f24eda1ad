//! Address plans, address-space plans and resource definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::AddressKind;

/// Name of the allowance that caps the sum of all non-subscription usage.
pub const AGGREGATE_ALLOWANCE: &str = "aggregate";

/// Amount of a named resource consumed by one address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub resource_name: String,
    pub amount: f64,
}

impl ResourceRequest {
    pub fn new(resource_name: impl Into<String>, amount: f64) -> Self {
        Self {
            resource_name: resource_name.into(),
            amount,
        }
    }
}

/// What one address of a given type consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressPlan {
    pub name: String,
    pub address_type: AddressKind,
    pub resources: Vec<ResourceRequest>,
}

/// An address type and the plans it offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressType {
    pub kind: AddressKind,
    #[serde(default)]
    pub description: String,
    pub plans: Vec<AddressPlan>,
}

impl AddressType {
    pub fn plan(&self, name: &str) -> Option<&AddressPlan> {
        self.plans.iter().find(|p| p.name == name)
    }
}

/// Ceiling for one named resource across an address space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAllowance {
    pub resource_name: String,
    #[serde(default)]
    pub min: f64,
    pub max: f64,
}

impl ResourceAllowance {
    pub fn new(resource_name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            resource_name: resource_name.into(),
            min,
            max,
        }
    }
}

/// Quota of an address space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressSpacePlan {
    pub name: String,
    #[serde(default)]
    pub address_space_type: String,
    /// Names of the address plans available in this space.
    #[serde(default)]
    pub address_plans: Vec<String>,
    pub resources: Vec<ResourceAllowance>,
}

impl AddressSpacePlan {
    /// The configured maximum for a resource name, if any.
    pub fn allowance(&self, resource_name: &str) -> Option<f64> {
        self.resources
            .iter()
            .find(|r| r.resource_name == resource_name)
            .map(|r| r.max)
    }
}

/// Deployment template reference for a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl ResourceDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
