//! Plan resolution contract.

use thiserror::Error;

use crate::{Address, AddressKind, AddressPlan, AddressType, ResourceDefinition};

/// Errors resolving an address to its type, plan or resource definitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown address type: {0}")]
    UnknownAddressType(AddressKind),

    #[error("unknown plan '{plan}' for address type {address_type}")]
    UnknownPlan {
        address_type: AddressKind,
        plan: String,
    },

    #[error("unknown resource definition: {0}")]
    UnknownResourceDefinition(String),
}

/// Supplies plan definitions for addresses.
pub trait PlanResolver: Send + Sync {
    fn resolve_type(&self, address: &Address) -> Result<&AddressType, ResolveError>;

    fn resolve_plan(
        &self,
        address_type: &AddressType,
        address: &Address,
    ) -> Result<&AddressPlan, ResolveError>;

    /// Resource definition by resource name, e.g. the pooled `broker`.
    fn resolve_resource_definition(
        &self,
        resource_name: &str,
    ) -> Result<&ResourceDefinition, ResolveError>;

    /// Resource definition for a resource as used by a specific plan.
    fn resolve_plan_resource_definition(
        &self,
        plan: &AddressPlan,
        resource_name: &str,
    ) -> Result<&ResourceDefinition, ResolveError>;

    /// Resolve type and plan in one step.
    fn plan_for(&self, address: &Address) -> Result<&AddressPlan, ResolveError> {
        let address_type = self.resolve_type(address)?;
        self.resolve_plan(address_type, address)
    }
}
