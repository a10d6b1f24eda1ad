//! The event logger contract.

use tracing::{info, warn};

use crate::{ControllerKind, ControllerReason, EventSeverity};

/// Sink for operator-visible controller events.
///
/// Implementations must not fail the caller: delivery problems are theirs to
/// log and drop.
pub trait EventLogger: Send + Sync {
    /// Record an event.
    fn log(
        &self,
        reason: ControllerReason,
        message: &str,
        severity: EventSeverity,
        kind: ControllerKind,
        subject: &str,
    );
}

/// Event logger that writes events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLogger;

impl EventLogger for TracingEventLogger {
    fn log(
        &self,
        reason: ControllerReason,
        message: &str,
        severity: EventSeverity,
        kind: ControllerKind,
        subject: &str,
    ) {
        match severity {
            EventSeverity::Normal => {
                info!(reason = %reason, kind = %kind, subject, "{message}");
            }
            EventSeverity::Warning => {
                warn!(reason = %reason, kind = %kind, subject, "{message}");
            }
        }
    }
}
