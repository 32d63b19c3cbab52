//! # Error Types
//!
//! Typed failure taxonomy for the provisioning core.
//!
//! Failures during manifest application always propagate to the lifecycle
//! controller, which decides the persisted tenant status and whether to run
//! the compensating delete. Failures during status lookup never reach this
//! module's callers as errors; the status reconciler absorbs them into a
//! classified [`crate::status::ComponentHealth`] value.

use thiserror::Error;

/// Malformed input, rejected before any remote call
#[derive(Debug, Error)]
#[error("validation failed: {0}")]
pub struct ValidationError(pub String);

/// Outcome of a namespace deletion request
///
/// Deleting a namespace that is already gone is not an error condition the
/// caller needs to distinguish from success, but it is tagged so callers can
/// log it accurately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The namespace existed and deletion was accepted by the cluster
    Deleted,
    /// The namespace was already gone
    AlreadyAbsent,
}

/// Failures raised by the resource orchestrator
///
/// Apply failures carry the manifest kind and name of the step that failed;
/// the remaining steps are never attempted.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to apply {kind} {name}: {source}")]
    Apply {
        kind: &'static str,
        name: String,
        #[source]
        source: kube::Error,
    },
    #[error("timed out applying {kind} {name} after {timeout_secs}s")]
    ApplyTimeout {
        kind: &'static str,
        name: String,
        timeout_secs: u64,
    },
    #[error("failed to delete namespace {namespace}: {source}")]
    Delete {
        namespace: String,
        #[source]
        source: kube::Error,
    },
    #[error("timed out deleting namespace {namespace} after {timeout_secs}s")]
    DeleteTimeout { namespace: String, timeout_secs: u64 },
}

/// Failures surfaced by lifecycle operations
///
/// A provisioning failure is deliberately NOT represented here: creation
/// returns the tenant in `Error` state rather than failing the call, per the
/// propagation policy. Only input, ownership, and store faults are hard
/// errors to the caller.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("tenant {0} not found")]
    TenantNotFound(String),
    #[error("tenant {tenant_id} is not owned by the requesting identity")]
    NotOwner { tenant_id: String },
    #[error("tenant store error: {0}")]
    Store(#[source] anyhow::Error),
    #[error("internal error: {0}")]
    Internal(String),
}
