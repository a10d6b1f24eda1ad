//! # fleet-id
//!
//! Names and identifiers for the physical side of a messaging fleet.
//!
//! ## Design Principles
//!
//! - Every name that reaches the cluster API is a valid DNS-1123 label
//! - Sharded cluster ids are derived deterministically from the owning
//!   address, so recomputing them never changes placement
//! - Names are typed to prevent mixing cluster ids with broker ids
//!
//! ## Name Formats
//!
//! | Kind | Format | Example |
//! | --- | --- | --- |
//! | Pooled cluster | `broker` | `broker` |
//! | Pooled broker | `broker-{n}` | `broker-3` |
//! | Sharded cluster | `{sanitized address prefix}-{uuid}` | `xlarge-top-6f1c...` |
//! | Subscription shard | `{cluster id}-{n}` | `xlarge-top-6f1c...-0` |
//! | Router instance | `all` | `all` |

mod error;
mod macros;
mod naming;
mod types;

pub use error::IdError;
pub use naming::*;
pub use types::*;
