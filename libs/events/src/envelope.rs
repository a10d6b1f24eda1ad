//! Event envelope - a fully described controller event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ControllerKind, ControllerReason, EventSeverity};

/// A single controller event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerEvent {
    pub reason: ControllerReason,
    pub message: String,
    pub severity: EventSeverity,
    pub kind: ControllerKind,
    /// Id of the object the event is about.
    pub subject: String,
    pub occurred_at: DateTime<Utc>,
}

impl ControllerEvent {
    /// Create an event stamped with the current time.
    pub fn new(
        reason: ControllerReason,
        message: impl Into<String>,
        severity: EventSeverity,
        kind: ControllerKind,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            reason,
            message: message.into(),
            severity,
            kind,
            subject: subject.into(),
            occurred_at: Utc::now(),
        }
    }

    /// Returns true for `Warning` events.
    pub fn is_warning(&self) -> bool {
        self.severity == EventSeverity::Warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_roundtrip() {
        let event = ControllerEvent::new(
            ControllerReason::BrokerCreated,
            "Created broker broker with 1 replicas",
            EventSeverity::Normal,
            ControllerKind::Broker,
            "broker",
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"reason\":\"BrokerCreated\""));
        let parsed: ControllerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
        assert!(!parsed.is_warning());
    }
}
