//! # fleet-testing
//!
//! Test doubles for the collaborators of the fleet controller, plus schema
//! and address fixtures shared by unit and end-to-end tests.
//!
//! Fakes record every call they receive and can be told to fail for
//! specific clusters or addresses, so tests can assert on side effects
//! without a cluster API.

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeClusterGenerator, FakeKubernetes, InMemoryAddressApi, RecordingEventLogger};
pub use fixtures::*;
