//! Tenant provisioner entrypoint.
//!
//! Wires the live cluster client into the lifecycle controller and serves
//! the tenant API with metrics and health probes.

use anyhow::Context;
use kube::Client;
use std::sync::Arc;
use tenant_provisioner::config;
use tenant_provisioner::lifecycle::TenantController;
use tenant_provisioner::observability::metrics;
use tenant_provisioner::orchestrator::ClusterOrchestrator;
use tenant_provisioner::server::{self, ServerState};
use tenant_provisioner::status::StatusReconciler;
use tenant_provisioner::store::MemoryStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tenant_provisioner=info")),
        )
        .init();

    info!("Starting tenant provisioner");

    metrics::register_metrics().context("Failed to register metrics")?;

    let (provisioner_config, server_config) = config::load_config();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let orchestrator = Arc::new(ClusterOrchestrator::new(
        client.clone(),
        &provisioner_config,
    ));
    let status = Arc::new(StatusReconciler::new(client, &provisioner_config));
    let store = Arc::new(MemoryStore::default());
    let controller = Arc::new(TenantController::new(
        store,
        orchestrator,
        status,
        provisioner_config,
    ));

    server::start_server(server_config.port, ServerState::new(controller)).await
}
