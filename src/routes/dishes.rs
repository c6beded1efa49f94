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
        dish::{AlternativesQuery, DishFilter, DishRequest},
    },
    services::dishes::DishService,
    AppState,
};

/// GET /api/dishes?vegetarian=true&vegan=true: public
pub async fn list_dishes(
    State(state): State<AppState>,
    Query(filter): Query<DishFilter>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    DishService::list(&state.db, &filter)
        .await
        .map(|dishes| Json(json!(dishes)))
        .map_err(reject)
}

/// GET /api/dishes/{id}: public
pub async fn get_dish(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    DishService::get(&state.db, id)
        .await
        .map(|dish| Json(json!(dish)))
        .map_err(reject)
}

/// GET /api/dishes/on/{date}: public
pub async fn dishes_on(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    DishService::on_date(&state.db, date)
        .await
        .map(|dishes| Json(json!(dishes)))
        .map_err(reject)
}

/// GET /api/dishes/{id}/available-dates: public
pub async fn available_dates(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    DishService::available_dates(&state.db, id, state.clock.today())
        .await
        .map(|dates| Json(json!(dates)))
        .map_err(reject)
}

/// GET /api/dishes/{id}/with-alternatives?origin_date=YYYY-MM-DD: public
pub async fn with_alternatives(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<AlternativesQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    DishService::with_alternatives(&state.db, id, params.origin_date, state.clock.today())
        .await
        .map(|dish| Json(json!(dish)))
        .map_err(reject)
}

/// POST /api/dishes: staff and admins only
pub async fn create_dish(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<DishRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    require_staff(&user)?;
    DishService::create(&state.db, &body)
        .await
        .map(|dish| (StatusCode::CREATED, Json(json!(dish))))
        .map_err(reject)
}

/// PUT /api/dishes/{id}: staff and admins only
pub async fn update_dish(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<DishRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_staff(&user)?;
    DishService::update(&state.db, id, &body)
        .await
        .map(|dish| Json(json!(dish)))
        .map_err(reject)
}

/// DELETE /api/dishes/{id}: staff and admins only
pub async fn delete_dish(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    require_staff(&user)?;
    DishService::delete(&state.db, id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(reject)
}
