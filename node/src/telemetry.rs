// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    // 1. Logs
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "strata_node=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Metrics (Prometheus)
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => {
            tracing::error!("Failed to install Prometheus recorder: {}", e);
            return;
        }
    }

    metrics::describe_counter!("strata_blocks_appended_total", "Blocks appended to the ledger");
    metrics::describe_histogram!(
        "strata_block_append_duration_seconds",
        "Time taken to append one block"
    );
    metrics::describe_counter!("strata_commits_total", "State commits by commit_type");
    metrics::describe_histogram!("strata_commit_duration_seconds", "Time taken by one commit");
    metrics::describe_gauge!("strata_pending_changes", "Changes waiting for the next commit");
    metrics::describe_counter!("strata_proofs_generated_total", "Chain proofs issued");

    metrics::gauge!("strata_node_up", 1.0);
}

/// Prometheus text exposition of every registered metric.
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
