use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    errors::reject,
    middleware::webhook::WebhookAuth,
    models::{auth::AuthenticatedUser, payment::PaymentRequest},
    services::payments::PaymentService,
    AppState,
};

/// POST /api/payments/{order_id}: order owner only
pub async fn process_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<i64>,
    Json(body): Json<PaymentRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    PaymentService::process(&state.db, state.email.clone(), order_id, user.user_id, &body)
        .await
        .map(|payment| Json(json!(payment)))
        .map_err(reject)
}

/// GET /api/payments/{order_id}: order owner only
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    PaymentService::get_for_order(&state.db, order_id, user.user_id)
        .await
        .map(|payment| Json(json!(payment)))
        .map_err(reject)
}

/// POST /api/payments/webhook: provider callback, plain-text body
/// `transaction_id:<id>,status:<success|failed>`
pub async fn webhook(
    State(state): State<AppState>,
    _auth: WebhookAuth,
    body: String,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    PaymentService::handle_webhook(&state.db, state.email.clone(), &body)
        .await
        .map(|_| Json(json!({ "received": true })))
        .map_err(reject)
}
