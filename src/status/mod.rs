//! # Status Reconciler
//!
//! Read-only classification of per-component workload health.
//!
//! Observed workload state is folded into a small health enum through an
//! ordered rule list; the first matching rule wins. Terminal failure signals
//! outrank healthy replica counts, and a fully converged workload outranks
//! progress signals, because a healthy rollout keeps reporting progress
//! conditions after it settles.
//!
//! Lookup faults never propagate as errors. A component that cannot be
//! observed is reported as `Error` with a message, so one broken lookup
//! cannot take down a status page listing many components.

use crate::config::ProvisionerConfig;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use kube::api::Api;
use kube::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// Health of one tenant component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComponentHealth {
    /// All desired replicas are updated, ready, and available
    Running,
    /// A rollout is underway or replicas have not converged yet
    Pending,
    /// A terminal failure signal, a missing workload, or a failed lookup
    Error,
    /// Replicas exist but some are unavailable or stale
    Unhealthy,
    /// The workload exists but has reported no status yet
    Unavailable,
    /// Observed state matches no classification rule
    Unknown,
}

impl ComponentHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentHealth::Running => "Running",
            ComponentHealth::Pending => "Pending",
            ComponentHealth::Error => "Error",
            ComponentHealth::Unhealthy => "Unhealthy",
            ComponentHealth::Unavailable => "Unavailable",
            ComponentHealth::Unknown => "Unknown",
        }
    }
}

/// Classified health of one named component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub name: String,
    pub health: ComponentHealth,
    pub message: Option<String>,
}

/// What a workload lookup found in the tenant namespace
///
/// Components are deployed either as a Deployment or a StatefulSet; the
/// lookup tries both before concluding the workload is missing. Absence is
/// a value, not an error.
enum WorkloadLookup {
    Deployment(Box<Deployment>),
    StatefulSet(Box<StatefulSet>),
    NotFound,
}

/// Source of classified component health
///
/// Implementations never return errors; faults are classified into the
/// health value itself.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn component_status(&self, namespace: &str, component: &str) -> ComponentStatus;
}

/// Status source backed by live workload reads against the cluster
pub struct StatusReconciler {
    client: Client,
    read_timeout: Duration,
}

impl StatusReconciler {
    pub fn new(client: Client, config: &ProvisionerConfig) -> Self {
        Self {
            client,
            read_timeout: config.status_timeout(),
        }
    }

    async fn lookup(&self, namespace: &str, component: &str) -> Result<WorkloadLookup, String> {
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        match tokio::time::timeout(self.read_timeout, deployments.get_opt(component)).await {
            Ok(Ok(Some(deployment))) => {
                return Ok(WorkloadLookup::Deployment(Box::new(deployment)))
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => return Err(format!("failed to read deployment: {e}")),
            Err(_) => return Err("timed out reading deployment".to_string()),
        }

        let stateful_sets: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        match tokio::time::timeout(self.read_timeout, stateful_sets.get_opt(component)).await {
            Ok(Ok(Some(sts))) => Ok(WorkloadLookup::StatefulSet(Box::new(sts))),
            Ok(Ok(None)) => Ok(WorkloadLookup::NotFound),
            Ok(Err(e)) => Err(format!("failed to read stateful set: {e}")),
            Err(_) => Err("timed out reading stateful set".to_string()),
        }
    }
}

#[async_trait]
impl StatusSource for StatusReconciler {
    async fn component_status(&self, namespace: &str, component: &str) -> ComponentStatus {
        let lookup = self.lookup(namespace, component).await;
        if let Err(message) = &lookup {
            warn!(namespace = %namespace, component = %component, error = %message, "Status lookup failed");
        }

        let (health, message) = classify_lookup(lookup);
        ComponentStatus {
            name: component.to_string(),
            health,
            message,
        }
    }
}

/// Fold a lookup result into a classified health value
///
/// Absence and lookup faults both classify as `Error`, with messages that
/// tell the two apart.
fn classify_lookup(lookup: Result<WorkloadLookup, String>) -> (ComponentHealth, Option<String>) {
    match lookup {
        Ok(WorkloadLookup::Deployment(deployment)) => classify_deployment(&deployment),
        Ok(WorkloadLookup::StatefulSet(sts)) => classify_stateful_set(&sts),
        Ok(WorkloadLookup::NotFound) => (
            ComponentHealth::Error,
            Some("Component not found".to_string()),
        ),
        Err(message) => (ComponentHealth::Error, Some(message)),
    }
}

/// Classify a Deployment's observed state, first matching rule wins
pub fn classify_deployment(deployment: &Deployment) -> (ComponentHealth, Option<String>) {
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);

    let Some(status) = deployment.status.as_ref() else {
        return (
            ComponentHealth::Unavailable,
            Some("no status reported yet".to_string()),
        );
    };

    let total = status.replicas.unwrap_or(0);
    let updated = status.updated_replicas.unwrap_or(0);
    let ready = status.ready_replicas.unwrap_or(0);
    let available = status.available_replicas.unwrap_or(0);
    let unavailable = status.unavailable_replicas.unwrap_or(0);
    let conditions = status.conditions.as_deref().unwrap_or(&[]);

    let failed = conditions.iter().find(|c| c.type_ == "Failed");
    if status.collision_count.unwrap_or(0) > 0 || failed.is_some() {
        let message = failed
            .and_then(|c| c.message.clone())
            .unwrap_or_else(|| "deployment reported a terminal failure".to_string());
        return (ComponentHealth::Error, Some(message));
    }

    if available == desired && updated == desired && ready == desired && unavailable == 0 {
        return (ComponentHealth::Running, None);
    }

    let progressing = conditions.iter().any(|c| {
        c.type_ == "Progressing"
            && c.status == "True"
            && matches!(
                c.reason.as_deref(),
                Some("NewReplicaSetAvailable") | Some("ReplicaSetUpdated")
            )
    });
    if progressing || updated < total || ready < desired || available < desired {
        return (
            ComponentHealth::Pending,
            Some(format!("{ready}/{desired} replicas ready")),
        );
    }

    if unavailable > 0 || updated < total || ready < total {
        return (
            ComponentHealth::Unhealthy,
            Some(format!("{unavailable} replicas unavailable")),
        );
    }

    (ComponentHealth::Unknown, None)
}

/// Classify a StatefulSet's observed state, first matching rule wins
pub fn classify_stateful_set(sts: &StatefulSet) -> (ComponentHealth, Option<String>) {
    let desired = sts.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);

    let Some(status) = sts.status.as_ref() else {
        return (
            ComponentHealth::Unavailable,
            Some("no status reported yet".to_string()),
        );
    };

    let ready = status.ready_replicas.unwrap_or(0);
    let current = status.current_replicas.unwrap_or(0);
    let available = status.available_replicas.unwrap_or(0);
    let conditions = status.conditions.as_deref().unwrap_or(&[]);

    if let Some(failed) = conditions.iter().find(|c| c.type_ == "Failed") {
        let message = failed
            .message
            .clone()
            .unwrap_or_else(|| "stateful set reported a terminal failure".to_string());
        return (ComponentHealth::Error, Some(message));
    }

    if available == desired && ready == desired && current == desired {
        return (ComponentHealth::Running, None);
    }

    if ready < desired || current < desired || available < desired {
        return (
            ComponentHealth::Pending,
            Some(format!("{ready}/{desired} replicas ready")),
        );
    }

    if conditions
        .iter()
        .any(|c| c.type_ == "Progressing" && c.status == "False")
    {
        return (
            ComponentHealth::Unhealthy,
            Some("rollout is not progressing".to_string()),
        );
    }

    (ComponentHealth::Unknown, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::{
        DeploymentCondition, DeploymentSpec, DeploymentStatus, StatefulSetSpec, StatefulSetStatus,
    };

    fn deployment(desired: i32, status: DeploymentStatus) -> Deployment {
        Deployment {
            spec: Some(DeploymentSpec {
                replicas: Some(desired),
                ..Default::default()
            }),
            status: Some(status),
            ..Default::default()
        }
    }

    #[test]
    fn converged_deployment_is_running() {
        let (health, message) = classify_deployment(&deployment(
            3,
            DeploymentStatus {
                replicas: Some(3),
                updated_replicas: Some(3),
                ready_replicas: Some(3),
                available_replicas: Some(3),
                unavailable_replicas: Some(0),
                conditions: Some(vec![DeploymentCondition {
                    type_: "Progressing".to_string(),
                    status: "True".to_string(),
                    reason: Some("NewReplicaSetAvailable".to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            },
        ));
        assert_eq!(health, ComponentHealth::Running);
        assert!(message.is_none());
    }

    #[test]
    fn failed_condition_wins_over_replica_counts() {
        let (health, message) = classify_deployment(&deployment(
            3,
            DeploymentStatus {
                replicas: Some(3),
                updated_replicas: Some(3),
                ready_replicas: Some(3),
                available_replicas: Some(3),
                unavailable_replicas: Some(0),
                conditions: Some(vec![DeploymentCondition {
                    type_: "Failed".to_string(),
                    status: "True".to_string(),
                    message: Some("quota exceeded".to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            },
        ));
        assert_eq!(health, ComponentHealth::Error);
        assert_eq!(message.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn partial_rollout_is_pending_not_unhealthy() {
        let (health, _) = classify_deployment(&deployment(
            3,
            DeploymentStatus {
                replicas: Some(3),
                updated_replicas: Some(1),
                ready_replicas: Some(1),
                available_replicas: Some(1),
                unavailable_replicas: Some(2),
                ..Default::default()
            },
        ));
        assert_eq!(health, ComponentHealth::Pending);
    }

    #[test]
    fn missing_status_block_is_unavailable() {
        let deployment = Deployment {
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (health, message) = classify_deployment(&deployment);
        assert_eq!(health, ComponentHealth::Unavailable);
        assert_eq!(message.as_deref(), Some("no status reported yet"));
    }

    #[test]
    fn collision_count_is_an_error() {
        let (health, _) = classify_deployment(&deployment(
            1,
            DeploymentStatus {
                collision_count: Some(1),
                ..Default::default()
            },
        ));
        assert_eq!(health, ComponentHealth::Error);
    }

    #[test]
    fn converged_stateful_set_is_running() {
        let sts = StatefulSet {
            spec: Some(StatefulSetSpec {
                replicas: Some(1),
                ..Default::default()
            }),
            status: Some(StatefulSetStatus {
                replicas: 1,
                ready_replicas: Some(1),
                current_replicas: Some(1),
                available_replicas: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (health, message) = classify_stateful_set(&sts);
        assert_eq!(health, ComponentHealth::Running);
        assert!(message.is_none());
    }

    #[test]
    fn scaling_stateful_set_is_pending() {
        let sts = StatefulSet {
            spec: Some(StatefulSetSpec {
                replicas: Some(2),
                ..Default::default()
            }),
            status: Some(StatefulSetStatus {
                replicas: 2,
                ready_replicas: Some(1),
                current_replicas: Some(2),
                available_replicas: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (health, message) = classify_stateful_set(&sts);
        assert_eq!(health, ComponentHealth::Pending);
        assert_eq!(message.as_deref(), Some("1/2 replicas ready"));
    }

    #[test]
    fn absent_workload_is_an_error_with_not_found_message() {
        let (health, message) = classify_lookup(Ok(WorkloadLookup::NotFound));
        assert_eq!(health, ComponentHealth::Error);
        assert_eq!(message.as_deref(), Some("Component not found"));
    }

    #[test]
    fn lookup_fault_is_an_error_carrying_the_fault_message() {
        let (health, message) =
            classify_lookup(Err("timed out reading deployment".to_string()));
        assert_eq!(health, ComponentHealth::Error);
        assert_eq!(message.as_deref(), Some("timed out reading deployment"));
    }

    #[test]
    fn found_deployment_delegates_to_the_deployment_rules() {
        let lookup = WorkloadLookup::Deployment(Box::new(deployment(
            1,
            DeploymentStatus {
                replicas: Some(1),
                updated_replicas: Some(1),
                ready_replicas: Some(1),
                available_replicas: Some(1),
                unavailable_replicas: Some(0),
                ..Default::default()
            },
        )));
        let (health, _) = classify_lookup(Ok(lookup));
        assert_eq!(health, ComponentHealth::Running);
    }

    #[test]
    fn stateful_set_without_status_is_unavailable() {
        let sts = StatefulSet {
            spec: Some(StatefulSetSpec {
                replicas: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (health, _) = classify_stateful_set(&sts);
        assert_eq!(health, ComponentHealth::Unavailable);
    }
}
