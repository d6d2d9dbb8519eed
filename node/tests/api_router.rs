use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use strata_kernel::change::{ChangeAction, PendingChange};
use strata_kernel::layer::Layer;
use strata_node::config::NodeConfig;
use strata_node::engine::Strata;
use strata_node::server::build_router;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt; // for oneshot

fn app(token: Option<&str>) -> (TempDir, Arc<Strata>, Router) {
    let dir = tempdir().unwrap();
    let strata = Arc::new(Strata::open(NodeConfig::with_data_dir(dir.path())).unwrap());
    let router = build_router(strata.clone(), token.map(str::to_string));
    (dir, strata, router)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn test_chain_routes() {
    let (_dir, _strata, app) = app(None);

    let (status, body) = send(&app, get("/v1/chain/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["length"], 1);

    let (status, body) = send(
        &app,
        post("/v1/chain/record", json!({ "logs": [json!({"type": "note"}).to_string()] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["block"]["index"], 1);

    let (status, body) = send(&app, get("/v1/chain/history?limit=5&type=note")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (_, body) = send(&app, get("/v1/chain/verify")).await;
    assert_eq!(body["valid"], true);

    let (status, body) = send(&app, get("/v1/chain/proof")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["length"], 2);

    let (status, _) = send(&app, post("/v1/chain/record", json!({ "logs": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_state_routes() {
    let (_dir, strata, app) = app(None);

    let (status, _) = send(&app, post("/v1/state/commit", json!({ "reason": "empty" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, post("/v1/state/commit", json!({ "reason": "", "force": true }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    strata
        .commits()
        .register_change(PendingChange::new(
            Layer::L1,
            ChangeAction::Create,
            "fact",
            "learned",
            "2025-01-01T00:00:00Z",
        ))
        .unwrap();

    let (_, body) = send(&app, get("/v1/state/status")).await;
    assert_eq!(body["pending_changes"]["total"], 1);

    let (status, body) = send(
        &app,
        post("/v1/state/commit", json!({ "reason": "checkpoint", "actor": "ops" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let hash = body["snapshot_hash"].as_str().unwrap().to_string();

    let (_, body) = send(&app, get("/v1/state/history?limit=5")).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["snapshots"][0]["created_by"], "ops");

    let (status, body) = send(&app, get(&format!("/v1/state/history?hash={}", &hash[..12]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshot_hash"], hash.as_str());

    let (status, _) = send(&app, get("/v1/state/history?hash=zz")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_guard() {
    let (_dir, _strata, app) = app(Some("s3cret"));

    let (status, _) = send(&app, get("/v1/chain/status")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/v1/chain/status")
        .header("authorization", "Bearer nope")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, wrong).await.0, StatusCode::UNAUTHORIZED);

    let right = Request::builder()
        .uri("/v1/chain/status")
        .header("authorization", "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, right).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_tampered_chain_refuses_proof() {
    let (dir, strata, app) = app(None);
    strata.ledger().append(vec!["a".to_string()]).unwrap();

    let path = dir.path().join("chain").join("blocks.json");
    let raw = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, raw.replace("\"a\"", "\"b\"")).unwrap();

    let (_, body) = send(&app, get("/v1/chain/verify")).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["failure"]["index"], 1);

    let (status, body) = send(&app, get("/v1/chain/proof")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("block 1"));
}
