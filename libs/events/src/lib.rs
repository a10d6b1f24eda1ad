//! # fleet-events
//!
//! Operator-visible events emitted by the messaging-fleet controller.
//!
//! ## Design Principles
//!
//! - Events are audit records, not control flow: emitting one never fails
//!   the operation that produced it
//! - Every event names the kind and id of the object it concerns
//! - Reasons form a closed vocabulary so dashboards can filter on them
//!
//! ## Event Shape
//!
//! An event carries:
//! - A reason code (`BrokerCreated`, `BrokerCreateFailed`, ...)
//! - A human-readable message
//! - A severity (`Normal` or `Warning`)
//! - The kind and id of the subject (`Broker` / `broker-0`)

mod envelope;
mod error;
mod logger;
mod types;

pub use envelope::ControllerEvent;
pub use error::EventError;
pub use logger::{EventLogger, TracingEventLogger};
pub use types::*;
