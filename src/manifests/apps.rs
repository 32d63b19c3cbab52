//! Stateless application workloads: backend and frontend.
//!
//! The two deployments are wired together (and to the storage workloads)
//! purely through internal service DNS names and environment variables.

use super::{container_port, env, http_probe, object_meta, pod_template, selector};
use crate::config::ProvisionerConfig;
use crate::constants::*;
use crate::credentials::TenantCredentials;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::Container;

pub(super) fn backend_deployment(
    namespace: &str,
    tenant_id: &str,
    credentials: &TenantCredentials,
    config: &ProvisionerConfig,
) -> Deployment {
    let frontend_url = config.access_url(tenant_id);
    let cookie_domain = format!("{}.{}", tenant_id, config.cluster_domain);
    let database_url = format!(
        "postgresql://{}:{}@{}:{}/{}",
        POSTGRES_USER,
        credentials.postgres_password,
        COMPONENT_POSTGRES,
        POSTGRES_PORT,
        POSTGRES_DB,
    );

    let container = Container {
        name: COMPONENT_BACKEND.to_string(),
        image: Some(config.backend_image.clone()),
        ports: Some(vec![container_port(BACKEND_PORT)]),
        env: Some(vec![
            env("PORT", BACKEND_PORT.to_string()),
            env("DATABASE_URL", database_url),
            env(
                "STORAGE_ENDPOINT",
                format!("http://{COMPONENT_MINIO}:{MINIO_PORT}"),
            ),
            env("STORAGE_ACCESS_KEY", credentials.minio_access_key.clone()),
            env("STORAGE_SECRET_KEY", credentials.minio_secret_key.clone()),
            env("FRONTEND_URL", frontend_url),
            env("COOKIE_DOMAIN", cookie_domain),
        ]),
        readiness_probe: Some(http_probe("/health", BACKEND_PORT)),
        liveness_probe: Some(http_probe("/health", BACKEND_PORT)),
        ..Default::default()
    };

    deployment(namespace, COMPONENT_BACKEND, container)
}

pub(super) fn frontend_deployment(namespace: &str, config: &ProvisionerConfig) -> Deployment {
    let container = Container {
        name: COMPONENT_FRONTEND.to_string(),
        image: Some(config.frontend_image.clone()),
        ports: Some(vec![container_port(FRONTEND_PORT)]),
        env: Some(vec![
            env("PORT", FRONTEND_PORT.to_string()),
            env(
                "BACKEND_URL",
                format!("http://{COMPONENT_BACKEND}:{BACKEND_PORT}"),
            ),
            env(
                "STORAGE_URL",
                format!("http://{COMPONENT_MINIO}:{MINIO_PORT}"),
            ),
        ]),
        ..Default::default()
    };

    deployment(namespace, COMPONENT_FRONTEND, container)
}

fn deployment(namespace: &str, component: &str, container: Container) -> Deployment {
    Deployment {
        metadata: object_meta(namespace, component),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: selector(component),
            template: pod_template(component, container),
            ..Default::default()
        }),
        ..Default::default()
    }
}
