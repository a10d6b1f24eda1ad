//! # fleet-model
//!
//! The data the fleet controller schedules over, and the contracts of the
//! collaborators it talks to.
//!
//! ## Contents
//!
//! - Addresses: logical destinations with a plan, placement annotations and
//!   a status phase (`address`)
//! - Plans: per-address resource requests and per-space allowances (`plan`)
//! - Clusters: router and broker deployment handles (`cluster`)
//! - Collaborators: plan resolution, cluster generation, the cluster API and
//!   the address store (`resolver`, `collaborators`)
//! - `StandardSchema`: an in-memory plan resolver loadable from JSON

mod address;
mod cluster;
mod collaborators;
mod plan;
mod resolver;
mod schema;

pub use address::*;
pub use cluster::*;
pub use collaborators::*;
pub use plan::*;
pub use resolver::*;
pub use schema::*;
