//! # Observability
//!
//! Prometheus metrics for the provisioner.

pub mod metrics;
