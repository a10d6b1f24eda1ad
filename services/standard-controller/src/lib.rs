//! Resource scheduling core of the standard address space controller.
//!
//! A reconcile pass computes the usage of admitted addresses
//! ([`usage::UsageComputer`]), admits pending addresses against the address
//! space quota ([`scheduler::QuotaScheduler`]) and turns the resulting usage
//! into router and broker replica counts ([`provision::ClusterProvisioner`]).
//! [`controller::AddressController`] wires the three together and
//! [`controller::ControllerWorker`] runs it periodically.

pub mod config;
pub mod controller;
pub mod provision;
pub mod scheduler;
pub mod telemetry;
pub mod usage;
