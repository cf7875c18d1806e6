use crate::{
    access::{self, DirectoryEntry},
    config::Config,
    errors::{GateError, GateResult},
    policy::{Mode, PolicyStore},
    security,
};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{sync::Arc, time::Instant};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub store: Arc<PolicyStore>,
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    /// Missing is treated as empty so it is rejected as `EmptyPath`.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct WhitelistRequest {
    pub pattern: String,
}

#[derive(Debug, Serialize)]
pub struct Listing {
    pub path: String,
    pub entries: Vec<DirectoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct PolicyView {
    pub base_dir: String,
    pub mode: Mode,
    pub pattern: String,
    pub enforce_whitelist: bool,
    pub check_symlinks: bool,
}

pub async fn serve(cfg: Config, store: PolicyStore) -> anyhow::Result<()> {
    let shared = AppState {
        cfg: Arc::new(cfg),
        store: Arc::new(store),
    };
    let addr = format!("{}:{}", shared.cfg.server.bind_addr, shared.cfg.server.port);
    let app = build_router(shared);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(shared: AppState) -> Router {
    let base = shared.cfg.server.base_path.trim_end_matches('/').to_string();
    let limit_bytes = shared.cfg.server.max_request_kb * 1024;
    Router::new()
        .route("/healthz", get(health))
        .route(&format!("{base}/resolve"), get(resolve))
        .route(&format!("{base}/list"), get(list))
        .route(&format!("{base}/policy"), get(policy))
        .route(
            &format!("{base}/whitelist"),
            put(set_whitelist).layer(RequestBodyLimitLayer::new(limit_bytes)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status":"ok"})))
}

async fn resolve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<PathQuery>,
) -> Response {
    let started = Instant::now();
    let outcome = authorize(&state, &headers).and_then(|()| state.store.resolve(&q.path));
    finish("resolve", started, outcome.map(|p| json!({"path": p})))
}

async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<PathQuery>,
) -> Response {
    let started = Instant::now();
    let outcome = match authorize(&state, &headers) {
        Ok(()) => {
            let store = state.store.clone();
            let raw = q.path.clone();
            tokio::task::spawn_blocking(move || access::list_directory(&store, &raw))
                .await
                .unwrap_or_else(|e| Err(GateError::Internal(e.to_string())))
        }
        Err(e) => Err(e),
    };
    finish(
        "list",
        started,
        outcome.map(|entries| Listing { path: q.path, entries }),
    )
}

async fn policy(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let outcome = authorize(&state, &headers).map(|()| {
        let p = state.store.snapshot();
        PolicyView {
            base_dir: p.base_dir().display().to_string(),
            mode: p.mode(),
            pattern: p.whitelist().as_str().to_string(),
            enforce_whitelist: p.enforces_whitelist(),
            check_symlinks: p.checks_symlinks(),
        }
    });
    finish("policy", started, outcome)
}

async fn set_whitelist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<WhitelistRequest>,
) -> Response {
    let started = Instant::now();
    let outcome = authorize(&state, &headers)
        .and_then(|()| state.store.set_whitelist_pattern(&req.pattern))
        .map(|()| json!({"pattern": req.pattern}));
    finish("set_whitelist", started, outcome)
}

fn finish<T: Serialize>(op: &str, started: Instant, outcome: GateResult<T>) -> Response {
    let duration_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(body) => {
            audit(op, "allow", "OK", duration_ms);
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            let decision = if e.is_policy_rejection() || matches!(e, GateError::Unauthorized) {
                "deny"
            } else {
                "error"
            };
            audit(op, decision, e.code(), duration_ms);
            e.into_response()
        }
    }
}

fn audit(op: &str, decision: &str, code: &str, duration_ms: u64) {
    let request_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        request_id = %request_id,
        op = op,
        decision = decision,
        code = code,
        duration_ms = duration_ms,
        "audit"
    );
}

fn authorize(state: &AppState, headers: &HeaderMap) -> GateResult<()> {
    security::require_bearer(headers, &state.cfg.auth.bearer_token)
}
