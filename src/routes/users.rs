use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    errors::reject,
    middleware::roles::require_admin,
    models::{
        auth::AuthenticatedUser,
        user::{ChangePasswordRequest, UpdateProfileRequest, UpdateRoleRequest, UserProfile},
    },
    services::users::UserService,
    AppState,
};

/// GET /api/users/me
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    UserService::get(&state.db, user.user_id)
        .await
        .map(|u| Json(json!(UserProfile::from(u))))
        .map_err(reject)
}

/// PUT /api/users/me
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    UserService::update_profile(&state.db, user.user_id, &body)
        .await
        .map(|profile| Json(json!(profile)))
        .map_err(reject)
}

/// PUT /api/users/me/password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    UserService::change_password(
        &state.db,
        user.user_id,
        &body.current_password,
        &body.new_password,
    )
    .await
    .map(|_| StatusCode::NO_CONTENT)
    .map_err(reject)
}

/// GET /api/users: admin only
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_admin(&user)?;
    UserService::list(&state.db)
        .await
        .map(|users| Json(json!(users)))
        .map_err(reject)
}

/// GET /api/users/{id}: admin only
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_admin(&user)?;
    UserService::get(&state.db, id)
        .await
        .map(|u| Json(json!(UserProfile::from(u))))
        .map_err(reject)
}

/// PUT /api/users/{id}/role: admin only
pub async fn set_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_admin(&user)?;
    UserService::set_role(&state.db, id, body.role)
        .await
        .map(|profile| Json(json!(profile)))
        .map_err(reject)
}
