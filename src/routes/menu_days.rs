use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::{
    errors::reject,
    middleware::roles::require_staff,
    models::{auth::AuthenticatedUser, menu::MenuDayRequest},
    services::menu::MenuService,
    AppState,
};

/// GET /api/menu-days: public
pub async fn list_menu_days(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    MenuService::list_all(&state.db)
        .await
        .map(|days| Json(json!(days)))
        .map_err(reject)
}

/// GET /api/menu-days/future: public
pub async fn list_future(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    MenuService::list_future(&state.db, state.clock.today())
        .await
        .map(|days| Json(json!(days)))
        .map_err(reject)
}

/// GET /api/menu-days/date/{date}: public
pub async fn get_by_date(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    MenuService::get_by_date(&state.db, date)
        .await
        .map(|day| Json(json!(day)))
        .map_err(reject)
}

/// GET /api/menu-days/{id}: public
pub async fn get_menu_day(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    MenuService::get(&state.db, id)
        .await
        .map(|day| Json(json!(day)))
        .map_err(reject)
}

/// POST /api/menu-days: staff and admins only
pub async fn create_menu_day(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<MenuDayRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    require_staff(&user)?;
    MenuService::create(&state.db, &body)
        .await
        .map(|day| (StatusCode::CREATED, Json(json!(day))))
        .map_err(reject)
}

/// PUT /api/menu-days/{id}: staff and admins only
pub async fn update_menu_day(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<MenuDayRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_staff(&user)?;
    MenuService::update(&state.db, id, &body)
        .await
        .map(|day| Json(json!(day)))
        .map_err(reject)
}

/// DELETE /api/menu-days/{id}: staff and admins only
pub async fn delete_menu_day(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    require_staff(&user)?;
    MenuService::delete(&state.db, id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(reject)
}
