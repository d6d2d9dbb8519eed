// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::extract::{Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use strata_kernel::proof::ChainProof;
use tower_http::trace::TraceLayer;

use crate::api::*;
use crate::commit::{CommitOutcome, CommitStatus};
use crate::engine::Strata;
use crate::errors::{Result, StrataError};
use crate::tools;

pub type SharedStrata = Arc<Strata>;

async fn auth_guard(
    State(token): State<Arc<String>>,
    req: Request,
    next: Next,
) -> std::result::Result<Response, StatusCode> {
    let provided = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.strip_prefix("Bearer "));

    match provided {
        Some(provided) if provided == token.as_str() => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

pub fn build_router(state: SharedStrata, auth_token: Option<String>) -> Router {
    let mut app = Router::new()
        // Chain
        .route("/v1/chain/status", get(chain_status))
        .route("/v1/chain/verify", get(chain_verify))
        .route("/v1/chain/history", get(chain_history))
        .route("/v1/chain/record", post(chain_record))
        .route("/v1/chain/proof", get(chain_proof))
        // State
        .route("/v1/state/commit", post(state_commit))
        .route("/v1/state/status", get(state_status))
        .route("/v1/state/history", get(state_history))
        // Observability
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    if let Some(token) = auth_token {
        tracing::info!("Auth Enabled: Bearer token required");
        app = app.layer(from_fn_with_state(Arc::new(token), auth_guard));
    } else {
        tracing::warn!("Auth Disabled: No token configured");
    }

    app.layer(TraceLayer::new_for_http())
}

/// Run a storage-bound operation on the blocking pool.
async fn blocking<T, F>(state: SharedStrata, op: F) -> Result<Json<T>>
where
    T: Send + 'static,
    F: FnOnce(&Strata) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(state.as_ref()))
        .await
        .map_err(|e| {
            tracing::error!("blocking task failed: {}", e);
            StrataError::Internal
        })?
        .map(Json)
}

async fn chain_status(State(state): State<SharedStrata>) -> Result<Json<ChainStatusResponse>> {
    blocking(state, tools::chain_status).await
}

async fn chain_verify(State(state): State<SharedStrata>) -> Result<Json<ChainVerifyResponse>> {
    blocking(state, tools::chain_verify).await
}

async fn chain_history(
    State(state): State<SharedStrata>,
    Query(q): Query<ChainHistoryQuery>,
) -> Result<Json<ChainHistoryResponse>> {
    blocking(state, move |s| {
        tools::chain_history(s, q.limit, q.record_type.as_deref())
    })
    .await
}

async fn chain_record(
    State(state): State<SharedStrata>,
    Json(req): Json<ChainRecordRequest>,
) -> Result<Json<ChainRecordResponse>> {
    blocking(state, move |s| tools::chain_record(s, req.logs)).await
}

async fn chain_proof(State(state): State<SharedStrata>) -> Result<Json<ChainProof>> {
    blocking(state, tools::chain_proof).await
}

async fn state_commit(
    State(state): State<SharedStrata>,
    Json(req): Json<StateCommitRequest>,
) -> Result<Json<CommitOutcome>> {
    blocking(state, move |s| {
        tools::state_commit(s, &req.reason, req.force, req.actor.as_deref())
    })
    .await
}

async fn state_status(State(state): State<SharedStrata>) -> Result<Json<CommitStatus>> {
    blocking(state, tools::state_status).await
}

async fn state_history(
    State(state): State<SharedStrata>,
    Query(q): Query<StateHistoryQuery>,
) -> Result<Json<StateHistoryResponse>> {
    blocking(state, move |s| {
        tools::state_history(s, q.limit, q.hash.as_deref())
    })
    .await
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}
