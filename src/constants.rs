//! # Constants
//!
//! Default values for configuration, workload wiring, and the HTTP server.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default timeout for mutating calls against the cluster API (seconds)
pub const DEFAULT_APPLY_TIMEOUT_SECS: u64 = 30;

/// Default timeout for status lookups against the cluster API (seconds)
pub const DEFAULT_STATUS_TIMEOUT_SECS: u64 = 10;

/// Default cluster domain under which tenant hosts are published
pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.example";

/// Default workload images
pub const DEFAULT_POSTGRES_IMAGE: &str = "postgres:17-alpine";
pub const DEFAULT_MINIO_IMAGE: &str = "minio/minio:latest";
pub const DEFAULT_BACKEND_IMAGE: &str = "tenant-platform/backend:latest";
pub const DEFAULT_FRONTEND_IMAGE: &str = "tenant-platform/frontend:latest";

/// Component names. These double as workload and service names inside the
/// tenant namespace, so the fixed topology is addressable by stable DNS names.
pub const COMPONENT_POSTGRES: &str = "postgres";
pub const COMPONENT_MINIO: &str = "minio";
pub const COMPONENT_BACKEND: &str = "backend";
pub const COMPONENT_FRONTEND: &str = "frontend";

/// All components of a tenant stack, in the order they are reported
pub const COMPONENTS: [&str; 4] = [
    COMPONENT_POSTGRES,
    COMPONENT_MINIO,
    COMPONENT_BACKEND,
    COMPONENT_FRONTEND,
];

/// Workload ports
pub const POSTGRES_PORT: i32 = 5432;
pub const MINIO_PORT: i32 = 9000;
pub const MINIO_CONSOLE_PORT: i32 = 9001;
pub const BACKEND_PORT: i32 = 3001;
pub const FRONTEND_PORT: i32 = 3000;

/// Size of the persistent volume claim backing each stateful workload
pub const VOLUME_SIZE: &str = "500Mi";

/// Database account provisioned for the tenant backend
pub const POSTGRES_USER: &str = "tenant";
pub const POSTGRES_DB: &str = "tenantdb";
