//! In-memory plan resolver for the standard address space.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    Address, AddressPlan, AddressSpacePlan, AddressType, PlanResolver, ResolveError,
    ResourceDefinition,
};

/// Errors loading a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid schema: {0}")]
    Invalid(String),
}

/// Address types, their plans, the address-space plan and resource
/// definitions of one address space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardSchema {
    pub address_space_plan: AddressSpacePlan,
    pub address_types: Vec<AddressType>,
    pub resource_definitions: Vec<ResourceDefinition>,
}

impl StandardSchema {
    /// Build a schema, validating it.
    pub fn new(
        address_space_plan: AddressSpacePlan,
        address_types: Vec<AddressType>,
        resource_definitions: Vec<ResourceDefinition>,
    ) -> Result<Self, SchemaError> {
        let schema = Self {
            address_space_plan,
            address_types,
            resource_definitions,
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let schema: Self = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn address_space_plan(&self) -> &AddressSpacePlan {
        &self.address_space_plan
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for allowance in &self.address_space_plan.resources {
            if !allowance.max.is_finite() || allowance.max < 0.0 {
                return Err(SchemaError::Invalid(format!(
                    "allowance for '{}' must be a non-negative number, got {}",
                    allowance.resource_name, allowance.max
                )));
            }
        }

        for address_type in &self.address_types {
            for plan in &address_type.plans {
                if plan.address_type != address_type.kind {
                    return Err(SchemaError::Invalid(format!(
                        "plan '{}' declares type {} but is listed under {}",
                        plan.name, plan.address_type, address_type.kind
                    )));
                }
                if let Some(request) = plan
                    .resources
                    .iter()
                    .find(|r| !r.amount.is_finite() || r.amount < 0.0)
                {
                    return Err(SchemaError::Invalid(format!(
                        "plan '{}' requests an invalid amount of '{}': {}",
                        plan.name, request.resource_name, request.amount
                    )));
                }
            }
        }

        for plan_name in &self.address_space_plan.address_plans {
            let known = self
                .address_types
                .iter()
                .any(|t| t.plan(plan_name).is_some());
            if !known {
                return Err(SchemaError::Invalid(format!(
                    "address space plan '{}' references unknown address plan '{}'",
                    self.address_space_plan.name, plan_name
                )));
            }
        }

        Ok(())
    }

    fn definition(&self, name: &str) -> Option<&ResourceDefinition> {
        self.resource_definitions.iter().find(|d| d.name == name)
    }
}

impl PlanResolver for StandardSchema {
    fn resolve_type(&self, address: &Address) -> Result<&AddressType, ResolveError> {
        self.address_types
            .iter()
            .find(|t| t.kind == address.kind)
            .ok_or(ResolveError::UnknownAddressType(address.kind))
    }

    fn resolve_plan(
        &self,
        address_type: &AddressType,
        address: &Address,
    ) -> Result<&AddressPlan, ResolveError> {
        // Look the type up again so the returned plan borrows from `self`.
        self.address_types
            .iter()
            .find(|t| t.kind == address_type.kind)
            .and_then(|t| t.plan(&address.plan))
            .ok_or_else(|| ResolveError::UnknownPlan {
                address_type: address_type.kind,
                plan: address.plan.clone(),
            })
    }

    fn resolve_resource_definition(
        &self,
        resource_name: &str,
    ) -> Result<&ResourceDefinition, ResolveError> {
        self.definition(resource_name)
            .ok_or_else(|| ResolveError::UnknownResourceDefinition(resource_name.to_string()))
    }

    fn resolve_plan_resource_definition(
        &self,
        plan: &AddressPlan,
        resource_name: &str,
    ) -> Result<&ResourceDefinition, ResolveError> {
        let specific = format!("{resource_name}-{}", plan.address_type);
        self.definition(&specific)
            .or_else(|| self.definition(resource_name))
            .ok_or_else(|| ResolveError::UnknownResourceDefinition(resource_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AddressKind;

    const SCHEMA: &str = r#"{
        "address_space_plan": {
            "name": "plan1",
            "address_space_type": "standard",
            "address_plans": ["small-queue", "small-topic"],
            "resources": [
                {"resource_name": "router", "max": 1.0},
                {"resource_name": "broker", "max": 3.0},
                {"resource_name": "aggregate", "max": 3.0}
            ]
        },
        "address_types": [
            {
                "kind": "queue",
                "plans": [{
                    "name": "small-queue",
                    "address_type": "queue",
                    "resources": [
                        {"resource_name": "router", "amount": 0.2},
                        {"resource_name": "broker", "amount": 0.4}
                    ]
                }]
            },
            {
                "kind": "topic",
                "plans": [{
                    "name": "small-topic",
                    "address_type": "topic",
                    "resources": [{"resource_name": "broker", "amount": 0.2}]
                }]
            }
        ],
        "resource_definitions": [
            {"name": "router"},
            {"name": "broker"},
            {"name": "broker-topic", "template": "sharded-topic"}
        ]
    }"#;

    #[test]
    fn test_load_and_resolve_plan() {
        let schema = StandardSchema::from_json(SCHEMA).unwrap();
        let address = Address::new("s.q", "q", AddressKind::Queue, "small-queue");

        let plan = schema.plan_for(&address).unwrap();
        assert_eq!(plan.name, "small-queue");
        assert_eq!(plan.resources.len(), 2);
        assert_eq!(schema.address_space_plan().allowance("broker"), Some(3.0));
    }

    #[test]
    fn test_unknown_plan_and_type() {
        let schema = StandardSchema::from_json(SCHEMA).unwrap();

        let address = Address::new("s.q", "q", AddressKind::Queue, "huge-queue");
        assert_eq!(
            schema.plan_for(&address).unwrap_err(),
            ResolveError::UnknownPlan {
                address_type: AddressKind::Queue,
                plan: "huge-queue".to_string()
            }
        );

        let address = Address::new("s.a", "a", AddressKind::Anycast, "small-anycast");
        assert_eq!(
            schema.plan_for(&address).unwrap_err(),
            ResolveError::UnknownAddressType(AddressKind::Anycast)
        );
    }

    #[test]
    fn test_plan_resource_definition_prefers_type_specific() {
        let schema = StandardSchema::from_json(SCHEMA).unwrap();
        let topic = Address::new("s.t", "t", AddressKind::Topic, "small-topic");
        let queue = Address::new("s.q", "q", AddressKind::Queue, "small-queue");

        let topic_plan = schema.plan_for(&topic).unwrap();
        let queue_plan = schema.plan_for(&queue).unwrap();

        assert_eq!(
            schema
                .resolve_plan_resource_definition(topic_plan, "broker")
                .unwrap()
                .name,
            "broker-topic"
        );
        assert_eq!(
            schema
                .resolve_plan_resource_definition(queue_plan, "broker")
                .unwrap()
                .name,
            "broker"
        );
        assert!(schema.resolve_resource_definition("storage").is_err());
    }

    #[test]
    fn test_rejects_unknown_plan_reference() {
        let json = SCHEMA.replace("\"small-topic\"]", "\"small-topic\", \"ghost\"]");
        let err = StandardSchema::from_json(&json).unwrap_err();
        assert!(matches!(err, SchemaError::Invalid(msg) if msg.contains("ghost")));
    }

    #[test]
    fn test_rejects_negative_allowance() {
        let json = SCHEMA.replace("\"max\": 1.0", "\"max\": -1.0");
        assert!(matches!(
            StandardSchema::from_json(&json).unwrap_err(),
            SchemaError::Invalid(_)
        ));
    }
}
