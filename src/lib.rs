//! Tenant Provisioner Library
//!
//! Core functionality for provisioning isolated per-tenant application
//! stacks on a shared Kubernetes cluster. Each tenant gets a dedicated
//! namespace containing Postgres, MinIO, a backend, a frontend, internal
//! services, and ingress routes.
//!
//! Unit tests live in the module files; cross-component scenarios are in
//! `tests/`.

pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod manifests;
pub mod observability;
pub mod orchestrator;
pub mod server;
pub mod status;
pub mod store;

// Re-export the types most callers need
pub use config::{ProvisionerConfig, ServerConfig};
pub use error::{DeleteOutcome, LifecycleError, OrchestratorError, ValidationError};
pub use lifecycle::TenantController;
pub use status::{ComponentHealth, ComponentStatus};
pub use store::{TenantRecord, TenantStatus, TenantStore};
