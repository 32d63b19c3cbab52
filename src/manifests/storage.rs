//! Stateful storage workloads: Postgres and MinIO.
//!
//! Each is a single-replica StatefulSet with a dedicated 500 MiB volume
//! claim mounted at its data directory.

use super::{container_port, env, http_probe, object_meta, pod_template, selector};
use crate::constants::*;
use crate::credentials::TenantCredentials;
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    Container, ExecAction, PersistentVolumeClaim, PersistentVolumeClaimSpec, Probe,
    VolumeResourceRequirements, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

const DATA_VOLUME: &str = "data";
const POSTGRES_DATA_DIR: &str = "/var/lib/postgresql/data";
const MINIO_DATA_DIR: &str = "/data";

pub(super) fn postgres_stateful_set(
    namespace: &str,
    credentials: &TenantCredentials,
    image: &str,
) -> StatefulSet {
    let probe = pg_ready_probe();
    let container = Container {
        name: COMPONENT_POSTGRES.to_string(),
        image: Some(image.to_string()),
        ports: Some(vec![container_port(POSTGRES_PORT)]),
        env: Some(vec![
            env("POSTGRES_USER", POSTGRES_USER),
            env("POSTGRES_PASSWORD", credentials.postgres_password.clone()),
            env("POSTGRES_DB", POSTGRES_DB),
        ]),
        readiness_probe: Some(probe.clone()),
        liveness_probe: Some(probe),
        volume_mounts: Some(vec![VolumeMount {
            name: DATA_VOLUME.to_string(),
            mount_path: POSTGRES_DATA_DIR.to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    stateful_set(namespace, COMPONENT_POSTGRES, container)
}

pub(super) fn minio_stateful_set(
    namespace: &str,
    credentials: &TenantCredentials,
    image: &str,
) -> StatefulSet {
    let container = Container {
        name: COMPONENT_MINIO.to_string(),
        image: Some(image.to_string()),
        args: Some(vec!["server".to_string(), MINIO_DATA_DIR.to_string()]),
        ports: Some(vec![
            container_port(MINIO_PORT),
            container_port(MINIO_CONSOLE_PORT),
        ]),
        env: Some(vec![
            env("MINIO_ROOT_USER", credentials.minio_access_key.clone()),
            env("MINIO_ROOT_PASSWORD", credentials.minio_secret_key.clone()),
        ]),
        readiness_probe: Some(http_probe("/minio/health/ready", MINIO_PORT)),
        liveness_probe: Some(http_probe("/minio/health/live", MINIO_PORT)),
        volume_mounts: Some(vec![VolumeMount {
            name: DATA_VOLUME.to_string(),
            mount_path: MINIO_DATA_DIR.to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    stateful_set(namespace, COMPONENT_MINIO, container)
}

/// Single-replica StatefulSet with a dedicated data volume claim
fn stateful_set(namespace: &str, component: &str, container: Container) -> StatefulSet {
    StatefulSet {
        metadata: object_meta(namespace, component),
        spec: Some(StatefulSetSpec {
            replicas: Some(1),
            selector: selector(component),
            service_name: Some(component.to_string()),
            template: pod_template(component, container),
            volume_claim_templates: Some(vec![data_volume_claim()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn data_volume_claim() -> PersistentVolumeClaim {
    let mut requests = BTreeMap::new();
    requests.insert("storage".to_string(), Quantity(VOLUME_SIZE.to_string()));

    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(DATA_VOLUME.to_string()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(requests),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pg_ready_probe() -> Probe {
    Probe {
        exec: Some(ExecAction {
            command: Some(vec![
                "pg_isready".to_string(),
                "-U".to_string(),
                POSTGRES_USER.to_string(),
            ]),
        }),
        initial_delay_seconds: Some(5),
        period_seconds: Some(10),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> TenantCredentials {
        TenantCredentials {
            postgres_password: "pw".repeat(16),
            minio_access_key: "ak".repeat(16),
            minio_secret_key: "sk".repeat(32),
        }
    }

    #[test]
    fn postgres_claims_500mi_volume() {
        let sts = postgres_stateful_set("tenant-x", &creds(), "postgres:17-alpine");
        let claims = sts
            .spec
            .as_ref()
            .and_then(|s| s.volume_claim_templates.as_ref())
            .expect("claims");
        assert_eq!(claims.len(), 1);
        let storage = claims[0]
            .spec
            .as_ref()
            .and_then(|s| s.resources.as_ref())
            .and_then(|r| r.requests.as_ref())
            .and_then(|r| r.get("storage"))
            .expect("storage request");
        assert_eq!(storage.0, "500Mi");
    }

    #[test]
    fn stateful_sets_name_their_governing_service() {
        let sts = postgres_stateful_set("tenant-x", &creds(), "postgres:17-alpine");
        assert_eq!(
            sts.spec.as_ref().and_then(|s| s.service_name.as_deref()),
            Some("postgres")
        );
    }

    #[test]
    fn minio_serves_data_dir_with_health_probes() {
        let sts = minio_stateful_set("tenant-x", &creds(), "minio/minio:latest");
        let container = &sts
            .spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref())
            .expect("pod spec")
            .containers[0];
        assert_eq!(
            container.args.as_deref(),
            Some(&["server".to_string(), "/data".to_string()][..])
        );
        let readiness_path = container
            .readiness_probe
            .as_ref()
            .and_then(|p| p.http_get.as_ref())
            .and_then(|h| h.path.as_deref());
        assert_eq!(readiness_path, Some("/minio/health/ready"));
        let liveness_path = container
            .liveness_probe
            .as_ref()
            .and_then(|p| p.http_get.as_ref())
            .and_then(|h| h.path.as_deref());
        assert_eq!(liveness_path, Some("/minio/health/live"));
    }
}
