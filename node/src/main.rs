// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;
use strata_node::config::NodeConfig;
use strata_node::engine::Strata;
use strata_node::server::build_router;
use strata_node::telemetry::init_telemetry;
use tokio::net::TcpListener;

fn main() {
    init_telemetry();

    let cfg = match NodeConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    tracing::info!("Initializing Strata node with config: {:?}", cfg);

    // Opened outside any async context: the postgres backend drives its own runtime.
    let strata = match Strata::open(cfg.clone()) {
        Ok(strata) => Arc::new(strata),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let app = build_router(strata.clone(), cfg.auth_token.clone());
    let served = runtime.block_on(async move {
        let listener = TcpListener::bind(cfg.bind_addr).await?;
        tracing::info!("Listening on {}", cfg.bind_addr);
        axum::serve(listener, app).await
    });
    drop(runtime);
    drop(strata);

    if let Err(e) = served {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
