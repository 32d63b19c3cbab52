//! # Lifecycle Controller
//!
//! Drives tenants through their state machine: Provisioning ends in Ready
//! or Error, Ready tenants can be deleted, and every observable state is
//! persisted before and after the cluster work it describes.
//!
//! Operations on the same tenant id are serialized through a per-id async
//! lock. Provisioning runs on a spawned task so a caller dropping its
//! request future cannot abandon a half-created namespace.
//!
//! Known gap: deletion removes the tenant record even when the namespace
//! delete fails, so cluster resources can outlive their record. The failure
//! is logged loudly; reconciling such orphans is an operational task.

use crate::config::ProvisionerConfig;
use crate::constants::COMPONENTS;
use crate::credentials::TenantCredentials;
use crate::error::{DeleteOutcome, LifecycleError, ValidationError};
use crate::manifests::{self, TenantManifests};
use crate::observability::metrics;
use crate::orchestrator::Orchestrator;
use crate::status::{ComponentStatus, StatusSource};
use crate::store::{TenantRecord, TenantStatus, TenantStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info, warn};
use uuid::Uuid;

/// A freshly created tenant, as returned to the caller
///
/// The URL and credentials are present only when provisioning succeeded;
/// credentials are returned exactly once, here.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedTenant {
    pub id: String,
    pub name: String,
    pub status: TenantStatus,
    pub url: Option<String>,
    pub credentials: Option<TenantCredentials>,
}

/// One tenant in a listing
#[derive(Debug, Clone, Serialize)]
pub struct TenantSummary {
    pub id: String,
    pub name: String,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub url: Option<String>,
}

/// Per-tenant-id async locks
///
/// Guards against interleaved lifecycle operations on the same tenant.
/// Operations on different tenants proceed concurrently.
#[derive(Debug, Default)]
struct TenantLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TenantLocks {
    async fn acquire(&self, tenant_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(tenant_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop the map entry for an id with no outstanding guard or waiter
    ///
    /// Guards and queued waiters each hold a clone of the entry's Arc, so
    /// a strong count of one means only the map itself still refers to it.
    fn prune(&self, tenant_id: &str) {
        let mut locks = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(tenant_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(tenant_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Orchestrates tenant lifecycle operations end to end
pub struct TenantController {
    store: Arc<dyn TenantStore>,
    orchestrator: Arc<dyn Orchestrator>,
    status: Arc<dyn StatusSource>,
    config: ProvisionerConfig,
    locks: TenantLocks,
}

impl TenantController {
    pub fn new(
        store: Arc<dyn TenantStore>,
        orchestrator: Arc<dyn Orchestrator>,
        status: Arc<dyn StatusSource>,
        config: ProvisionerConfig,
    ) -> Self {
        Self {
            store,
            orchestrator,
            status,
            config,
            locks: TenantLocks::default(),
        }
    }

    /// Create and provision a tenant
    ///
    /// A provisioning failure is not an error to the caller: the tenant is
    /// returned in `Error` state with its record persisted. Only invalid
    /// input and store faults fail the call.
    pub async fn create(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<ProvisionedTenant, LifecycleError> {
        if name.trim().is_empty() {
            return Err(ValidationError("tenant name must not be empty".to_string()).into());
        }

        let tenant_id = Uuid::new_v4().to_string();
        let guard = self.locks.acquire(&tenant_id).await;

        let now = Utc::now();
        self.store
            .insert(TenantRecord {
                id: tenant_id.clone(),
                name: name.trim().to_string(),
                owner: owner.to_string(),
                status: TenantStatus::Provisioning,
                created_at: now,
                updated_at: now,
                credentials: None,
            })
            .await
            .map_err(LifecycleError::Store)?;
        info!(tenant_id = %tenant_id, name = %name, "Provisioning tenant");

        let credentials = TenantCredentials::generate();
        let manifests = match manifests::build(&tenant_id, &credentials, &self.config) {
            Ok(manifests) => manifests,
            Err(e) => {
                // The record already exists; leave it behind in Error state
                // rather than silently dropping it.
                if let Err(store_err) = self
                    .store
                    .update_status(&tenant_id, TenantStatus::Error)
                    .await
                {
                    error!(tenant_id = %tenant_id, error = %store_err, "Failed to record provisioning error");
                }
                return Err(e.into());
            }
        };

        // Run the cluster work on its own task: if the caller drops this
        // future mid-provision, the apply and any compensating delete still
        // run to completion. The per-id guard moves into the task so the
        // lock is released only when provisioning settles, not when the
        // caller's future is dropped.
        let store = Arc::clone(&self.store);
        let orchestrator = Arc::clone(&self.orchestrator);
        let task_id = tenant_id.clone();
        let task_credentials = credentials.clone();
        let status = tokio::spawn(async move {
            let _guard = guard;
            run_provisioning(store, orchestrator, &task_id, task_credentials, manifests).await
        })
        .await
        .map_err(|e| LifecycleError::Internal(format!("provisioning task failed: {e}")))??;

        let (url, credentials) = match status {
            TenantStatus::Ready => (Some(self.config.access_url(&tenant_id)), Some(credentials)),
            _ => (None, None),
        };

        Ok(ProvisionedTenant {
            id: tenant_id,
            name: name.trim().to_string(),
            status,
            url,
            credentials,
        })
    }

    /// Delete a tenant and its cluster resources
    ///
    /// The record is removed even if the namespace delete fails; the
    /// failure is logged and counted so orphaned namespaces can be found.
    pub async fn delete(&self, owner: &str, tenant_id: &str) -> Result<(), LifecycleError> {
        let guard = self.locks.acquire(tenant_id).await;
        let result = self.delete_locked(owner, tenant_id).await;
        drop(guard);
        if result.is_ok() {
            self.locks.prune(tenant_id);
        }
        result
    }

    async fn delete_locked(&self, owner: &str, tenant_id: &str) -> Result<(), LifecycleError> {
        let record = self.owned_record(owner, tenant_id).await?;

        if record.status == TenantStatus::Ready {
            self.store
                .update_status(tenant_id, TenantStatus::Deleting)
                .await
                .map_err(LifecycleError::Store)?;
        }

        let namespace = manifests::namespace_name(tenant_id);
        match self.orchestrator.delete_namespace(&namespace).await {
            Ok(DeleteOutcome::Deleted) => {
                info!(tenant_id = %tenant_id, namespace = %namespace, "Tenant namespace deleted");
            }
            Ok(DeleteOutcome::AlreadyAbsent) => {
                info!(tenant_id = %tenant_id, namespace = %namespace, "Tenant namespace was already gone");
            }
            Err(e) => {
                metrics::increment_cleanup_failures();
                warn!(
                    tenant_id = %tenant_id,
                    namespace = %namespace,
                    error = %e,
                    "Namespace delete failed, removing tenant record anyway"
                );
            }
        }

        self.store
            .remove(tenant_id)
            .await
            .map_err(LifecycleError::Store)?;
        metrics::increment_tenants_deleted();
        info!(tenant_id = %tenant_id, "Tenant removed");
        Ok(())
    }

    /// List the caller's tenants
    pub async fn list(&self, owner: &str) -> Result<Vec<TenantSummary>, LifecycleError> {
        let records = self
            .store
            .list_by_owner(owner)
            .await
            .map_err(LifecycleError::Store)?;

        Ok(records
            .into_iter()
            .map(|record| {
                let url = (record.status == TenantStatus::Ready)
                    .then(|| self.config.access_url(&record.id));
                TenantSummary {
                    id: record.id,
                    name: record.name,
                    status: record.status,
                    created_at: record.created_at,
                    url,
                }
            })
            .collect())
    }

    /// Classified health of every component of one tenant
    pub async fn component_statuses(
        &self,
        owner: &str,
        tenant_id: &str,
    ) -> Result<Vec<ComponentStatus>, LifecycleError> {
        self.owned_record(owner, tenant_id).await?;

        let namespace = manifests::namespace_name(tenant_id);
        let lookups = COMPONENTS
            .iter()
            .map(|component| self.status.component_status(&namespace, component));
        let statuses = futures::future::join_all(lookups).await;

        for status in &statuses {
            metrics::increment_status_queries(status.health.as_str());
        }
        Ok(statuses)
    }

    async fn owned_record(
        &self,
        owner: &str,
        tenant_id: &str,
    ) -> Result<TenantRecord, LifecycleError> {
        let record = self
            .store
            .get(tenant_id)
            .await
            .map_err(LifecycleError::Store)?
            .ok_or_else(|| LifecycleError::TenantNotFound(tenant_id.to_string()))?;
        if record.owner != owner {
            return Err(LifecycleError::NotOwner {
                tenant_id: tenant_id.to_string(),
            });
        }
        Ok(record)
    }
}

/// Apply the resource set and settle the tenant into Ready or Error
///
/// On apply failure the compensating namespace delete runs exactly once.
/// Its own failure is logged and counted separately and never overrides
/// the Error outcome.
async fn run_provisioning(
    store: Arc<dyn TenantStore>,
    orchestrator: Arc<dyn Orchestrator>,
    tenant_id: &str,
    credentials: TenantCredentials,
    manifests: TenantManifests,
) -> Result<TenantStatus, LifecycleError> {
    match orchestrator.apply(&manifests).await {
        Ok(()) => {
            store
                .set_credentials(tenant_id, credentials)
                .await
                .map_err(LifecycleError::Store)?;
            store
                .update_status(tenant_id, TenantStatus::Ready)
                .await
                .map_err(LifecycleError::Store)?;
            metrics::increment_tenants_provisioned();
            info!(tenant_id = %tenant_id, "Tenant provisioned");
            Ok(TenantStatus::Ready)
        }
        Err(apply_err) => {
            metrics::increment_provisioning_failures();
            error!(tenant_id = %tenant_id, error = %apply_err, "Provisioning failed, rolling back");

            if let Err(store_err) = store.update_status(tenant_id, TenantStatus::Error).await {
                error!(tenant_id = %tenant_id, error = %store_err, "Failed to record provisioning error");
            }

            let namespace = manifests::namespace_name(tenant_id);
            metrics::increment_compensating_deletes();
            match orchestrator.delete_namespace(&namespace).await {
                Ok(_) => {
                    info!(tenant_id = %tenant_id, namespace = %namespace, "Rolled back partial resources");
                }
                Err(cleanup_err) => {
                    metrics::increment_compensation_failures();
                    error!(
                        tenant_id = %tenant_id,
                        namespace = %namespace,
                        error = %cleanup_err,
                        "Rollback failed, partial resources may remain"
                    );
                }
            }

            Ok(TenantStatus::Error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lock_entries_are_pruned_once_released() {
        let locks = TenantLocks::default();
        let guard = locks.acquire("a").await;

        // Outstanding guard keeps the entry alive
        locks.prune("a");
        assert_eq!(locks.len(), 1);

        drop(guard);
        locks.prune("a");
        assert_eq!(locks.len(), 0);
    }
}
