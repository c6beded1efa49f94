use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    errors::reject,
    middleware::rate_limit::{check_rate_limit, rate_key, SIGNIN_LIMIT, SIGNUP_LIMIT},
    models::user::{LoginRequest, SignupRequest},
    services::auth::AuthService,
    AppState,
};

/// POST /api/auth/signup: public; new accounts always get the `user` role.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &rate_key("signup", &body.email), SIGNUP_LIMIT).await?;

    AuthService::signup(&state.db, &body)
        .await
        .map(|profile| (StatusCode::CREATED, Json(json!(profile))))
        .map_err(reject)
}

/// POST /api/auth/signin
pub async fn signin(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &rate_key("signin", &body.email), SIGNIN_LIMIT).await?;

    AuthService::signin(
        &state.db,
        state.email.clone(),
        &body.email,
        &body.password,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )
    .await
    .map(|login| Json(json!(login)))
    .map_err(reject)
}
