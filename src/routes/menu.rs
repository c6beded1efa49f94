use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::{
    errors::reject,
    models::menu::MenuWeekQuery,
    services::menu::MenuService,
    AppState,
};

/// GET /api/menu/today: public
pub async fn today(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    MenuService::get_by_date(&state.db, state.clock.today())
        .await
        .map(|day| Json(json!(day)))
        .map_err(reject)
}

/// GET /api/menu/date/{date}: public
pub async fn on_date(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    MenuService::get_by_date(&state.db, date)
        .await
        .map(|day| Json(json!(day)))
        .map_err(reject)
}

/// GET /api/menu/week?start=YYYY-MM-DD: public; days without a menu are omitted
pub async fn week(
    State(state): State<AppState>,
    Query(params): Query<MenuWeekQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    MenuService::week(&state.db, params.start)
        .await
        .map(|days| Json(json!(days)))
        .map_err(reject)
}
