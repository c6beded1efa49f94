use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

/// GET /health: database and Redis reachability.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db = sqlx::query("SELECT 1").execute(&state.db).await;

    let mut redis = state.redis.clone();
    let cache: Result<String, _> = redis::cmd("PING").query_async(&mut redis).await;

    match (db, cache) {
        (Ok(_), Ok(_)) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "db": "connected", "redis": "connected" })),
        ),
        (Err(e), _) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "db": e.to_string() })),
        ),
        (Ok(_), Err(e)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "db": "connected", "redis": e.to_string() })),
        ),
    }
}
