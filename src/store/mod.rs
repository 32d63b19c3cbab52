//! # Tenant Store
//!
//! Interface to the persistent record of tenants and their credentials.
//!
//! The store owns tenant records exclusively; the core reads and writes
//! them through this trait and never caches them beyond one request. The
//! in-memory implementation below backs the binary and the test suite; a
//! durable store is an external collaborator behind the same trait.

use crate::credentials::TenantCredentials;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Lifecycle state of a tenant
///
/// Transitions are monotonic: Provisioning ends in Ready or Error, Ready
/// may move to Deleting, and nothing ever re-enters Provisioning or leaves
/// Error except by record removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenantStatus {
    Provisioning,
    Ready,
    Error,
    Deleting,
}

impl TenantStatus {
    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(self, next: TenantStatus) -> bool {
        matches!(
            (self, next),
            (TenantStatus::Provisioning, TenantStatus::Ready)
                | (TenantStatus::Provisioning, TenantStatus::Error)
                | (TenantStatus::Ready, TenantStatus::Deleting)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TenantStatus::Provisioning => "Provisioning",
            TenantStatus::Ready => "Ready",
            TenantStatus::Error => "Error",
            TenantStatus::Deleting => "Deleting",
        }
    }
}

/// Persisted record of one tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Immutable opaque id; also derives the cluster namespace name
    pub id: String,
    /// Display name
    pub name: String,
    /// Identity that created the tenant; deletes are checked against it
    pub owner: String,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Generated secrets; set once, after a successful provision
    pub credentials: Option<TenantCredentials>,
}

/// Persistent store for tenant records
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn insert(&self, record: TenantRecord) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<TenantRecord>>;
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<TenantRecord>>;
    async fn update_status(&self, id: &str, status: TenantStatus) -> Result<()>;
    async fn set_credentials(&self, id: &str, credentials: TenantCredentials) -> Result<()>;
    async fn remove(&self, id: &str) -> Result<()>;
}

/// In-process store keyed by tenant id
#[derive(Debug, Default)]
pub struct MemoryStore {
    tenants: RwLock<HashMap<String, TenantRecord>>,
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn insert(&self, record: TenantRecord) -> Result<()> {
        let mut tenants = self.tenants.write().await;
        if tenants.contains_key(&record.id) {
            return Err(anyhow!("tenant {} already exists", record.id));
        }
        tenants.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<TenantRecord>> {
        Ok(self.tenants.read().await.get(id).cloned())
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<TenantRecord>> {
        let mut records: Vec<TenantRecord> = self
            .tenants
            .read()
            .await
            .values()
            .filter(|record| record.owner == owner)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    async fn update_status(&self, id: &str, status: TenantStatus) -> Result<()> {
        let mut tenants = self.tenants.write().await;
        let record = tenants
            .get_mut(id)
            .ok_or_else(|| anyhow!("tenant {id} not found"))?;
        if !record.status.can_transition_to(status) {
            return Err(anyhow!(
                "invalid status transition {} -> {} for tenant {id}",
                record.status.as_str(),
                status.as_str(),
            ));
        }
        record.status = status;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn set_credentials(&self, id: &str, credentials: TenantCredentials) -> Result<()> {
        let mut tenants = self.tenants.write().await;
        let record = tenants
            .get_mut(id)
            .ok_or_else(|| anyhow!("tenant {id} not found"))?;
        record.credentials = Some(credentials);
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.tenants.write().await.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, owner: &str) -> TenantRecord {
        let now = Utc::now();
        TenantRecord {
            id: id.to_string(),
            name: id.to_string(),
            owner: owner.to_string(),
            status: TenantStatus::Provisioning,
            created_at: now,
            updated_at: now,
            credentials: None,
        }
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner() {
        let store = MemoryStore::default();
        store.insert(record("a", "alice")).await.expect("insert");
        store.insert(record("b", "bob")).await.expect("insert");

        let mine = store.list_by_owner("alice").await.expect("list");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "a");
    }

    #[tokio::test]
    async fn error_tenants_cannot_become_ready() {
        let store = MemoryStore::default();
        store.insert(record("a", "alice")).await.expect("insert");
        store
            .update_status("a", TenantStatus::Error)
            .await
            .expect("to error");

        let result = store.update_status("a", TenantStatus::Ready).await;
        assert!(result.is_err());

        let stored = store.get("a").await.expect("get").expect("record");
        assert_eq!(stored.status, TenantStatus::Error);
    }

    #[tokio::test]
    async fn no_transition_back_into_provisioning() {
        let store = MemoryStore::default();
        store.insert(record("a", "alice")).await.expect("insert");
        store
            .update_status("a", TenantStatus::Ready)
            .await
            .expect("to ready");

        let result = store.update_status("a", TenantStatus::Provisioning).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryStore::default();
        store.insert(record("a", "alice")).await.expect("insert");
        assert!(store.insert(record("a", "alice")).await.is_err());
    }
}
