//! # Manifest Builder
//!
//! Pure construction of the desired-state resource set for one tenant:
//! a namespace, two stateful storage workloads (Postgres, MinIO), two
//! stateless application workloads (backend, frontend), one ClusterIP
//! service per workload, and two ingress routes.
//!
//! Builders are deterministic and perform no I/O: identical inputs yield
//! byte-identical manifests. Manifests are values, regenerated on every
//! apply, never persisted.

mod apps;
mod network;
mod storage;

use crate::config::ProvisionerConfig;
use crate::constants::*;
use crate::credentials::TenantCredentials;
use crate::error::ValidationError;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, HTTPGetAction, Namespace, PodSpec, PodTemplateSpec, Probe,
    Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Derive the tenant namespace name from the tenant id
///
/// This is a pure function of the id and never changes over the tenant's
/// lifetime.
pub fn namespace_name(tenant_id: &str) -> String {
    format!("tenant-{tenant_id}")
}

/// The full desired-state resource set for one tenant
#[derive(Debug, Clone)]
pub struct TenantManifests {
    pub namespace: Namespace,
    pub stateful_sets: Vec<StatefulSet>,
    pub deployments: Vec<Deployment>,
    pub services: Vec<Service>,
    pub ingresses: Vec<Ingress>,
}

/// A borrowed reference to one manifest, tagged with its kind
///
/// Used to walk the resource set in apply order without committing callers
/// to a concrete cluster client.
#[derive(Debug)]
pub enum ManifestRef<'a> {
    Namespace(&'a Namespace),
    StatefulSet(&'a StatefulSet),
    Deployment(&'a Deployment),
    Service(&'a Service),
    Ingress(&'a Ingress),
}

impl ManifestRef<'_> {
    /// Kubernetes kind of the referenced manifest
    pub fn kind(&self) -> &'static str {
        match self {
            ManifestRef::Namespace(_) => "Namespace",
            ManifestRef::StatefulSet(_) => "StatefulSet",
            ManifestRef::Deployment(_) => "Deployment",
            ManifestRef::Service(_) => "Service",
            ManifestRef::Ingress(_) => "Ingress",
        }
    }

    /// Object name of the referenced manifest
    pub fn name(&self) -> String {
        match self {
            ManifestRef::Namespace(r) => r.name_any(),
            ManifestRef::StatefulSet(r) => r.name_any(),
            ManifestRef::Deployment(r) => r.name_any(),
            ManifestRef::Service(r) => r.name_any(),
            ManifestRef::Ingress(r) => r.name_any(),
        }
    }
}

impl TenantManifests {
    /// Walk the resource set in strict dependency order:
    /// namespace, stateful storage workloads, stateless workloads,
    /// internal services, external routes.
    pub fn ordered(&self) -> Vec<ManifestRef<'_>> {
        let mut refs = vec![ManifestRef::Namespace(&self.namespace)];
        refs.extend(self.stateful_sets.iter().map(ManifestRef::StatefulSet));
        refs.extend(self.deployments.iter().map(ManifestRef::Deployment));
        refs.extend(self.services.iter().map(ManifestRef::Service));
        refs.extend(self.ingresses.iter().map(ManifestRef::Ingress));
        refs
    }
}

/// Build the full desired-state resource set for a tenant
///
/// Pure and deterministic. Fails only on an empty tenant id.
pub fn build(
    tenant_id: &str,
    credentials: &TenantCredentials,
    config: &ProvisionerConfig,
) -> Result<TenantManifests, ValidationError> {
    if tenant_id.trim().is_empty() {
        return Err(ValidationError("tenant id must not be empty".to_string()));
    }

    let ns = namespace_name(tenant_id);

    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(ns.clone()),
            labels: Some(common_labels(&ns)),
            ..Default::default()
        },
        ..Default::default()
    };

    let stateful_sets = vec![
        storage::postgres_stateful_set(&ns, credentials, &config.postgres_image),
        storage::minio_stateful_set(&ns, credentials, &config.minio_image),
    ];

    let deployments = vec![
        apps::backend_deployment(&ns, tenant_id, credentials, config),
        apps::frontend_deployment(&ns, config),
    ];

    let services = vec![
        network::cluster_ip_service(&ns, COMPONENT_POSTGRES, POSTGRES_PORT),
        network::cluster_ip_service(&ns, COMPONENT_MINIO, MINIO_PORT),
        network::cluster_ip_service(&ns, COMPONENT_BACKEND, BACKEND_PORT),
        network::cluster_ip_service(&ns, COMPONENT_FRONTEND, FRONTEND_PORT),
    ];

    let ingresses = vec![
        network::ingress_route(
            &ns,
            "app",
            &format!("{}.{}", tenant_id, config.cluster_domain),
            COMPONENT_FRONTEND,
            FRONTEND_PORT,
        ),
        network::ingress_route(
            &ns,
            "cdn",
            &format!("cdn.{}.{}", tenant_id, config.cluster_domain),
            COMPONENT_MINIO,
            MINIO_PORT,
        ),
    ];

    Ok(TenantManifests {
        namespace,
        stateful_sets,
        deployments,
        services,
        ingresses,
    })
}

/// Standard labels applied to every managed object
pub(crate) fn common_labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app.kubernetes.io/name".to_string(), name.to_string());
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        "tenant-provisioner".to_string(),
    );
    labels
}

/// Selector labels tying a workload's pods to its service
pub(crate) fn selector_labels(component: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), component.to_string());
    labels
}

pub(crate) fn object_meta(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(common_labels(name)),
        ..Default::default()
    }
}

pub(crate) fn env(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        ..Default::default()
    }
}

pub(crate) fn http_probe(path: &str, port: i32) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.to_string()),
            port: IntOrString::Int(port),
            ..Default::default()
        }),
        initial_delay_seconds: Some(5),
        period_seconds: Some(10),
        ..Default::default()
    }
}

/// Pod template with a single container, selector-labelled for `component`
pub(crate) fn pod_template(component: &str, container: Container) -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(selector_labels(component)),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            containers: vec![container],
            ..Default::default()
        }),
    }
}

pub(crate) fn selector(component: &str) -> LabelSelector {
    LabelSelector {
        match_labels: Some(selector_labels(component)),
        ..Default::default()
    }
}

pub(crate) fn container_port(port: i32) -> ContainerPort {
    ContainerPort {
        container_port: port,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> TenantCredentials {
        TenantCredentials {
            postgres_password: "a".repeat(32),
            minio_access_key: "b".repeat(32),
            minio_secret_key: "c".repeat(64),
        }
    }

    #[test]
    fn namespace_name_is_stable() {
        assert_eq!(namespace_name("acme-id"), "tenant-acme-id");
        assert_eq!(namespace_name("acme-id"), namespace_name("acme-id"));
    }

    #[test]
    fn empty_tenant_id_is_rejected() {
        let result = build("", &test_credentials(), &ProvisionerConfig::default());
        assert!(result.is_err());

        let result = build("   ", &test_credentials(), &ProvisionerConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn build_is_deterministic() {
        let creds = test_credentials();
        let config = ProvisionerConfig::default();
        let first = build("acme-id", &creds, &config).expect("build");
        let second = build("acme-id", &creds, &config).expect("build");

        let first_json = serde_json::to_string(&first.ordered_json()).expect("serialize");
        let second_json = serde_json::to_string(&second.ordered_json()).expect("serialize");
        assert_eq!(first_json, second_json);
    }

    #[test]
    fn ordered_walk_matches_dependency_order() {
        let manifests = build(
            "acme-id",
            &test_credentials(),
            &ProvisionerConfig::default(),
        )
        .expect("build");

        let kinds: Vec<&str> = manifests.ordered().iter().map(|m| m.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "Namespace",
                "StatefulSet",
                "StatefulSet",
                "Deployment",
                "Deployment",
                "Service",
                "Service",
                "Service",
                "Service",
                "Ingress",
                "Ingress",
            ]
        );
    }

    #[test]
    fn ingress_hosts_follow_domain_layout() {
        let manifests = build(
            "acme-id",
            &test_credentials(),
            &ProvisionerConfig::default(),
        )
        .expect("build");

        let hosts: Vec<String> = manifests
            .ingresses
            .iter()
            .filter_map(|ing| ing.spec.as_ref())
            .filter_map(|spec| spec.rules.as_ref())
            .flatten()
            .filter_map(|rule| rule.host.clone())
            .collect();
        assert_eq!(
            hosts,
            vec!["acme-id.cluster.example", "cdn.acme-id.cluster.example"]
        );
    }

    #[test]
    fn backend_env_wires_internal_services() {
        let manifests = build(
            "acme-id",
            &test_credentials(),
            &ProvisionerConfig::default(),
        )
        .expect("build");

        let backend = &manifests.deployments[0];
        let container = &backend
            .spec
            .as_ref()
            .expect("spec")
            .template
            .spec
            .as_ref()
            .expect("pod spec")
            .containers[0];
        let env_vars = container.env.as_ref().expect("env");
        let database_url = env_vars
            .iter()
            .find(|e| e.name == "DATABASE_URL")
            .and_then(|e| e.value.as_deref())
            .expect("DATABASE_URL");
        assert_eq!(
            database_url,
            format!("postgresql://tenant:{}@postgres:5432/tenantdb", "a".repeat(32))
        );
    }

    #[test]
    fn every_manifest_lands_in_the_tenant_namespace() {
        let manifests = build(
            "acme-id",
            &test_credentials(),
            &ProvisionerConfig::default(),
        )
        .expect("build");

        for manifest in manifests.ordered().iter().skip(1) {
            let namespace = match manifest {
                ManifestRef::StatefulSet(r) => r.metadata.namespace.clone(),
                ManifestRef::Deployment(r) => r.metadata.namespace.clone(),
                ManifestRef::Service(r) => r.metadata.namespace.clone(),
                ManifestRef::Ingress(r) => r.metadata.namespace.clone(),
                ManifestRef::Namespace(_) => continue,
            };
            assert_eq!(namespace.as_deref(), Some("tenant-acme-id"));
        }
    }

    impl TenantManifests {
        /// JSON projection of the ordered resource set, used to compare
        /// builds structurally in tests.
        fn ordered_json(&self) -> Vec<serde_json::Value> {
            self.ordered()
                .iter()
                .map(|m| match m {
                    ManifestRef::Namespace(r) => serde_json::to_value(r).expect("serialize"),
                    ManifestRef::StatefulSet(r) => serde_json::to_value(r).expect("serialize"),
                    ManifestRef::Deployment(r) => serde_json::to_value(r).expect("serialize"),
                    ManifestRef::Service(r) => serde_json::to_value(r).expect("serialize"),
                    ManifestRef::Ingress(r) => serde_json::to_value(r).expect("serialize"),
                })
                .collect()
        }
    }
}
