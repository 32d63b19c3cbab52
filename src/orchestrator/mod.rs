//! # Resource Orchestrator
//!
//! Translates a built resource set into cluster state. Resources are
//! applied in the dependency order the set walks itself in; the first
//! failure aborts the sequence and is reported with the kind and name of
//! the resource that failed. Teardown deletes the tenant namespace and
//! relies on the cluster's cascading delete for everything inside it.
//!
//! Every remote call is bounded by a timeout from configuration so a hung
//! apiserver cannot wedge a lifecycle operation indefinitely.

use crate::config::ProvisionerConfig;
use crate::error::{DeleteOutcome, OrchestratorError};
use crate::manifests::{ManifestRef, TenantManifests};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, info};

/// Applies and tears down tenant resource sets against a cluster
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Apply the resource set in dependency order, aborting on the first
    /// failure.
    async fn apply(&self, manifests: &TenantManifests) -> Result<(), OrchestratorError>;

    /// Delete the tenant namespace, cascading to everything inside it.
    ///
    /// Deleting a namespace that does not exist is not an error; callers
    /// learn which case occurred through the outcome.
    async fn delete_namespace(&self, namespace: &str) -> Result<DeleteOutcome, OrchestratorError>;
}

/// Orchestrator backed by a live cluster client
pub struct ClusterOrchestrator {
    client: Client,
    apply_timeout: Duration,
}

impl ClusterOrchestrator {
    pub fn new(client: Client, config: &ProvisionerConfig) -> Self {
        Self {
            client,
            apply_timeout: config.apply_timeout(),
        }
    }

    async fn create<K>(&self, api: Api<K>, kind: &'static str, resource: &K) -> Result<(), OrchestratorError>
    where
        K: Resource + Clone + Debug + DeserializeOwned + Serialize,
    {
        let name = resource
            .meta()
            .name
            .clone()
            .unwrap_or_else(|| "<unnamed>".to_string());
        debug!(kind, name = %name, "Applying resource");

        let result = tokio::time::timeout(
            self.apply_timeout,
            api.create(&PostParams::default(), resource),
        )
        .await;

        match result {
            Ok(Ok(_)) => {
                info!(kind, name = %name, "Applied resource");
                Ok(())
            }
            Ok(Err(source)) => Err(OrchestratorError::Apply { kind, name, source }),
            Err(_) => Err(OrchestratorError::ApplyTimeout {
                kind,
                name,
                timeout_secs: self.apply_timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl Orchestrator for ClusterOrchestrator {
    async fn apply(&self, manifests: &TenantManifests) -> Result<(), OrchestratorError> {
        let namespace = manifests
            .namespace
            .meta()
            .name
            .clone()
            .unwrap_or_default();

        for manifest in manifests.ordered() {
            match manifest {
                ManifestRef::Namespace(resource) => {
                    self.create(Api::all(self.client.clone()), "Namespace", resource)
                        .await?;
                }
                ManifestRef::StatefulSet(resource) => {
                    self.create(
                        Api::namespaced(self.client.clone(), &namespace),
                        "StatefulSet",
                        resource,
                    )
                    .await?;
                }
                ManifestRef::Deployment(resource) => {
                    self.create(
                        Api::namespaced(self.client.clone(), &namespace),
                        "Deployment",
                        resource,
                    )
                    .await?;
                }
                ManifestRef::Service(resource) => {
                    self.create(
                        Api::namespaced(self.client.clone(), &namespace),
                        "Service",
                        resource,
                    )
                    .await?;
                }
                ManifestRef::Ingress(resource) => {
                    self.create(
                        Api::namespaced(self.client.clone(), &namespace),
                        "Ingress",
                        resource,
                    )
                    .await?;
                }
            }
        }

        info!(namespace = %namespace, "Applied full resource set");
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<DeleteOutcome, OrchestratorError> {
        let api: Api<Namespace> = Api::all(self.client.clone());

        let result = tokio::time::timeout(
            self.apply_timeout,
            api.delete(namespace, &DeleteParams::default()),
        )
        .await;

        match result {
            Ok(Ok(_)) => {
                info!(namespace = %namespace, "Namespace delete initiated");
                Ok(DeleteOutcome::Deleted)
            }
            Ok(Err(kube::Error::Api(ae))) if ae.code == 404 => {
                info!(namespace = %namespace, "Namespace already absent");
                Ok(DeleteOutcome::AlreadyAbsent)
            }
            Ok(Err(source)) => Err(OrchestratorError::Delete {
                namespace: namespace.to_string(),
                source,
            }),
            Err(_) => Err(OrchestratorError::DeleteTimeout {
                namespace: namespace.to_string(),
                timeout_secs: self.apply_timeout.as_secs(),
            }),
        }
    }
}
