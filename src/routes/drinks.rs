use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    errors::reject,
    middleware::roles::require_staff,
    models::{
        auth::AuthenticatedUser,
        drink::{DrinkRequest, StockQuery},
    },
    services::drinks::DrinkService,
    AppState,
};

/// GET /api/drinks: public
pub async fn list_drinks(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    DrinkService::list(&state.db)
        .await
        .map(|drinks| Json(json!(drinks)))
        .map_err(reject)
}

/// GET /api/drinks/available: public
pub async fn list_available(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    DrinkService::list_available(&state.db)
        .await
        .map(|drinks| Json(json!(drinks)))
        .map_err(reject)
}

/// GET /api/drinks/{id}: public
pub async fn get_drink(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    DrinkService::get(&state.db, id)
        .await
        .map(|drink| Json(json!(drink)))
        .map_err(reject)
}

/// POST /api/drinks: staff and admins only
pub async fn create_drink(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<DrinkRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    require_staff(&user)?;
    DrinkService::create(&state.db, &body)
        .await
        .map(|drink| (StatusCode::CREATED, Json(json!(drink))))
        .map_err(reject)
}

/// PUT /api/drinks/{id}: staff and admins only
pub async fn update_drink(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<DrinkRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_staff(&user)?;
    DrinkService::update(&state.db, id, &body)
        .await
        .map(|drink| Json(json!(drink)))
        .map_err(reject)
}

/// PUT /api/drinks/{id}/stock?stock=N: staff and admins only
pub async fn update_stock(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(params): Query<StockQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_staff(&user)?;
    DrinkService::update_stock(&state.db, id, params.stock)
        .await
        .map(|drink| Json(json!(drink)))
        .map_err(reject)
}

/// DELETE /api/drinks/{id}: staff and admins only
pub async fn delete_drink(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    require_staff(&user)?;
    DrinkService::delete(&state.db, id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(reject)
}
