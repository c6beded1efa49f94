use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::{
    errors::reject,
    middleware::roles::require_staff,
    models::{
        auth::AuthenticatedUser,
        order::{OrderRequest, StatusUpdateQuery},
    },
    services::orders::OrderService,
    AppState,
};

/// GET /api/orders/mine
pub async fn my_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    OrderService::list_for_user(&state.db, user.user_id)
        .await
        .map(|orders| Json(json!(orders)))
        .map_err(reject)
}

/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<OrderRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    OrderService::create(
        &state.db,
        state.clock.as_ref(),
        state.email.clone(),
        user.user_id,
        &body,
    )
    .await
    .map(|order| (StatusCode::CREATED, Json(json!(order))))
    .map_err(reject)
}

/// POST /api/orders/validate: like POST /api/orders, but answers with
/// alternative dates instead of an error when the order cannot be placed.
pub async fn create_with_validation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<OrderRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let res = OrderService::create_with_validation(
        &state.db,
        state.clock.as_ref(),
        state.email.clone(),
        user.user_id,
        &body,
    )
    .await
    .map_err(reject)?;

    let status = if res.success {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(json!(res))))
}

/// GET /api/orders/{id}: owner, staff or admin
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    OrderService::get_for(&state.db, id, &user)
        .await
        .map(|order| Json(json!(order)))
        .map_err(reject)
}

/// PUT /api/orders/{id}/cancel: owner only
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    OrderService::cancel(&state.db, id, user.user_id)
        .await
        .map(|order| Json(json!(order)))
        .map_err(reject)
}

/// GET /api/orders: staff and admins only
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_staff(&user)?;
    OrderService::list_all(&state.db)
        .await
        .map(|orders| Json(json!(orders)))
        .map_err(reject)
}

/// GET /api/orders/date/{date}: staff and admins only
pub async fn orders_on(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_staff(&user)?;
    OrderService::list_by_pickup_date(&state.db, date)
        .await
        .map(|orders| Json(json!(orders)))
        .map_err(reject)
}

/// PUT /api/orders/{id}/status?status=ready: staff and admins only
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(params): Query<StatusUpdateQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_staff(&user)?;
    OrderService::set_status(&state.db, state.email.clone(), id, params.status)
        .await
        .map(|order| Json(json!(order)))
        .map_err(reject)
}
