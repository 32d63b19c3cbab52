//! # Configuration
//!
//! Process-level configuration loaded from environment variables (populated
//! from a ConfigMap via `envFrom` in the deployment).
//!
//! All settings have sensible defaults and can be overridden via environment
//! variables. The configuration is read once at startup and shared read-only
//! across concurrent operations.

use crate::constants::*;
use std::time::Duration;

/// Provisioner configuration
///
/// Covers the cluster domain tenants are published under, the workload
/// images baked into tenant manifests, and the remote-call timeouts.
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// Cluster domain; tenant hosts are `<id>.<domain>` and `cdn.<id>.<domain>`
    pub cluster_domain: String,
    /// Whether tenant URLs are served over TLS (selects http vs https)
    pub tls_enabled: bool,
    /// Image for the tenant Postgres instance
    pub postgres_image: String,
    /// Image for the tenant MinIO instance
    pub minio_image: String,
    /// Image for the tenant backend
    pub backend_image: String,
    /// Image for the tenant frontend
    pub frontend_image: String,
    /// Timeout for mutating calls against the cluster API (seconds)
    pub apply_timeout_secs: u64,
    /// Timeout for status lookups against the cluster API (seconds)
    pub status_timeout_secs: u64,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            cluster_domain: DEFAULT_CLUSTER_DOMAIN.to_string(),
            tls_enabled: true,
            postgres_image: DEFAULT_POSTGRES_IMAGE.to_string(),
            minio_image: DEFAULT_MINIO_IMAGE.to_string(),
            backend_image: DEFAULT_BACKEND_IMAGE.to_string(),
            frontend_image: DEFAULT_FRONTEND_IMAGE.to_string(),
            apply_timeout_secs: DEFAULT_APPLY_TIMEOUT_SECS,
            status_timeout_secs: DEFAULT_STATUS_TIMEOUT_SECS,
        }
    }
}

impl ProvisionerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            cluster_domain: env_var_or_default(
                "CLUSTER_DOMAIN",
                DEFAULT_CLUSTER_DOMAIN.to_string(),
            ),
            tls_enabled: env_var_or_default("TLS_ENABLED", true),
            postgres_image: env_var_or_default(
                "POSTGRES_IMAGE",
                DEFAULT_POSTGRES_IMAGE.to_string(),
            ),
            minio_image: env_var_or_default("MINIO_IMAGE", DEFAULT_MINIO_IMAGE.to_string()),
            backend_image: env_var_or_default("BACKEND_IMAGE", DEFAULT_BACKEND_IMAGE.to_string()),
            frontend_image: env_var_or_default(
                "FRONTEND_IMAGE",
                DEFAULT_FRONTEND_IMAGE.to_string(),
            ),
            apply_timeout_secs: env_var_or_default("APPLY_TIMEOUT_SECS", DEFAULT_APPLY_TIMEOUT_SECS),
            status_timeout_secs: env_var_or_default(
                "STATUS_TIMEOUT_SECS",
                DEFAULT_STATUS_TIMEOUT_SECS,
            ),
        }
    }

    /// URL scheme selected by the TLS flag
    pub fn scheme(&self) -> &'static str {
        if self.tls_enabled {
            "https"
        } else {
            "http"
        }
    }

    /// Externally reachable URL for a tenant
    pub fn access_url(&self, tenant_id: &str) -> String {
        format!("{}://{}.{}", self.scheme(), tenant_id, self.cluster_domain)
    }

    /// Timeout for mutating cluster calls
    pub fn apply_timeout(&self) -> Duration {
        Duration::from_secs(self.apply_timeout_secs)
    }

    /// Timeout for status lookups
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server port for the API, metrics, and health probes
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_METRICS_PORT,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
        }
    }
}

/// Load all configuration from environment variables with defaults
pub fn load_config() -> (ProvisionerConfig, ServerConfig) {
    (ProvisionerConfig::from_env(), ServerConfig::from_env())
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_url_uses_tls_flag() {
        let mut config = ProvisionerConfig::default();
        assert_eq!(config.access_url("acme-id"), "https://acme-id.cluster.example");

        config.tls_enabled = false;
        assert_eq!(config.access_url("acme-id"), "http://acme-id.cluster.example");
    }

    #[test]
    fn defaults_are_sane() {
        let config = ProvisionerConfig::default();
        assert_eq!(config.apply_timeout(), Duration::from_secs(30));
        assert_eq!(config.status_timeout(), Duration::from_secs(10));
        assert_eq!(config.scheme(), "https");
    }
}
