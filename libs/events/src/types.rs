//! Event vocabulary: reasons, subject kinds and severities.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::EventError;

// =============================================================================
// Reasons
// =============================================================================

/// Why an event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerReason {
    /// A broker cluster was created.
    BrokerCreated,
    /// Generating or creating a broker cluster failed.
    BrokerCreateFailed,
    /// A router or broker scale call failed.
    ScaleFailed,
    /// An address was held back because a resource allowance is exhausted.
    QuotaExceeded,
    /// No broker had room for an address.
    PlacementFailed,
}

impl ControllerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrokerCreated => "BrokerCreated",
            Self::BrokerCreateFailed => "BrokerCreateFailed",
            Self::ScaleFailed => "ScaleFailed",
            Self::QuotaExceeded => "QuotaExceeded",
            Self::PlacementFailed => "PlacementFailed",
        }
    }
}

impl std::fmt::Display for ControllerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControllerReason {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BrokerCreated" => Ok(Self::BrokerCreated),
            "BrokerCreateFailed" => Ok(Self::BrokerCreateFailed),
            "ScaleFailed" => Ok(Self::ScaleFailed),
            "QuotaExceeded" => Ok(Self::QuotaExceeded),
            "PlacementFailed" => Ok(Self::PlacementFailed),
            other => Err(EventError::UnknownReason(other.to_string())),
        }
    }
}

// =============================================================================
// Subject Kinds
// =============================================================================

/// Kind of object an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerKind {
    Address,
    Broker,
    Router,
}

impl ControllerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Address => "Address",
            Self::Broker => "Broker",
            Self::Router => "Router",
        }
    }
}

impl std::fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControllerKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Address" => Ok(Self::Address),
            "Broker" => Ok(Self::Broker),
            "Router" => Ok(Self::Router),
            other => Err(EventError::UnknownKind(other.to_string())),
        }
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Event severity, matching the cluster API's event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSeverity {
    Normal,
    Warning,
}

impl EventSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
        }
    }
}

impl std::fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventSeverity {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(Self::Normal),
            "Warning" => Ok(Self::Warning),
            other => Err(EventError::UnknownSeverity(other.to_string())),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_serialization() {
        assert_eq!(
            serde_json::to_string(&ControllerReason::BrokerCreateFailed).unwrap(),
            "\"BrokerCreateFailed\""
        );
    }

    #[test]
    fn test_reason_roundtrip_through_str() {
        let reasons = vec![
            ControllerReason::BrokerCreated,
            ControllerReason::BrokerCreateFailed,
            ControllerReason::ScaleFailed,
            ControllerReason::QuotaExceeded,
            ControllerReason::PlacementFailed,
        ];
        for reason in reasons {
            let parsed: ControllerReason = reason.as_str().parse().unwrap();
            assert_eq!(reason, parsed);
        }
    }

    #[test]
    fn test_unknown_values_rejected() {
        assert_eq!(
            "Exploded".parse::<ControllerReason>().unwrap_err(),
            EventError::UnknownReason("Exploded".to_string())
        );
        assert!("Pod".parse::<ControllerKind>().is_err());
        assert!("Error".parse::<EventSeverity>().is_err());
    }
}
