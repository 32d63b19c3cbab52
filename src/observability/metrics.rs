//! # Metrics
//!
//! Prometheus counters covering the tenant lifecycle: provisions, rollbacks,
//! deletions, and status queries. All metrics live in a dedicated registry
//! rendered by the `/metrics` endpoint.

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static TENANTS_PROVISIONED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tenants_provisioned_total",
        "Total number of tenants provisioned successfully",
    )
    .expect("Failed to create tenants_provisioned_total metric - this should never happen")
});

static PROVISIONING_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "provisioning_failures_total",
        "Total number of tenant provisioning attempts that failed",
    )
    .expect("Failed to create provisioning_failures_total metric - this should never happen")
});

static COMPENSATING_DELETES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "compensating_deletes_total",
        "Total number of rollback namespace deletes after failed provisions",
    )
    .expect("Failed to create compensating_deletes_total metric - this should never happen")
});

static COMPENSATION_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "compensation_failures_total",
        "Total number of rollback namespace deletes that themselves failed",
    )
    .expect("Failed to create compensation_failures_total metric - this should never happen")
});

static TENANTS_DELETED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tenants_deleted_total",
        "Total number of tenants deleted",
    )
    .expect("Failed to create tenants_deleted_total metric - this should never happen")
});

static CLEANUP_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cleanup_failures_total",
        "Total number of tenant deletions whose namespace delete failed",
    )
    .expect("Failed to create cleanup_failures_total metric - this should never happen")
});

static STATUS_QUERIES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "status_queries_total",
            "Total number of component status classifications, by resulting health",
        ),
        &["health"],
    )
    .expect("Failed to create status_queries_total metric - this should never happen")
});

/// Register all metrics with the registry, called once at startup
pub fn register_metrics() -> Result<()> {
    REGISTRY
        .register(Box::new(TENANTS_PROVISIONED_TOTAL.clone()))
        .context("Failed to register tenants_provisioned_total")?;
    REGISTRY
        .register(Box::new(PROVISIONING_FAILURES_TOTAL.clone()))
        .context("Failed to register provisioning_failures_total")?;
    REGISTRY
        .register(Box::new(COMPENSATING_DELETES_TOTAL.clone()))
        .context("Failed to register compensating_deletes_total")?;
    REGISTRY
        .register(Box::new(COMPENSATION_FAILURES_TOTAL.clone()))
        .context("Failed to register compensation_failures_total")?;
    REGISTRY
        .register(Box::new(TENANTS_DELETED_TOTAL.clone()))
        .context("Failed to register tenants_deleted_total")?;
    REGISTRY
        .register(Box::new(CLEANUP_FAILURES_TOTAL.clone()))
        .context("Failed to register cleanup_failures_total")?;
    REGISTRY
        .register(Box::new(STATUS_QUERIES_TOTAL.clone()))
        .context("Failed to register status_queries_total")?;
    Ok(())
}

pub fn increment_tenants_provisioned() {
    TENANTS_PROVISIONED_TOTAL.inc();
}

pub fn increment_provisioning_failures() {
    PROVISIONING_FAILURES_TOTAL.inc();
}

pub fn increment_compensating_deletes() {
    COMPENSATING_DELETES_TOTAL.inc();
}

pub fn increment_compensation_failures() {
    COMPENSATION_FAILURES_TOTAL.inc();
}

pub fn increment_tenants_deleted() {
    TENANTS_DELETED_TOTAL.inc();
}

pub fn increment_cleanup_failures() {
    CLEANUP_FAILURES_TOTAL.inc();
}

pub fn increment_status_queries(health: &str) {
    STATUS_QUERIES_TOTAL.with_label_values(&[health]).inc();
}

/// Render the registry in the Prometheus text exposition format
pub fn render() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics buffer was not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let before = TENANTS_PROVISIONED_TOTAL.get();
        increment_tenants_provisioned();
        assert_eq!(TENANTS_PROVISIONED_TOTAL.get(), before + 1);
    }

    #[test]
    fn status_queries_are_labelled_by_health() {
        increment_status_queries("Running");
        assert!(
            STATUS_QUERIES_TOTAL
                .with_label_values(&["Running"])
                .get()
                >= 1
        );
    }
}
