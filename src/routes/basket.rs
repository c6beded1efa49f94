use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    models::basket::{BasketValidationRequest, BasketValidationResponse},
    services::{basket::BasketService, metrics::BASKET_VALIDATIONS_COUNTER},
    AppState,
};

fn outcome(res: &BasketValidationResponse) -> &'static str {
    if res.valid {
        "valid"
    } else if res.has_conflicting_dates {
        "conflict"
    } else {
        "partial"
    }
}

/// POST /api/basket/validate: public; anonymous baskets can be checked before sign-in
pub async fn validate_basket(
    State(state): State<AppState>,
    Json(body): Json<BasketValidationRequest>,
) -> Json<Value> {
    let res = BasketService::validate_with_pool(&state.db, &body, state.clock.today()).await;

    BASKET_VALIDATIONS_COUNTER
        .with_label_values(&[outcome(&res)])
        .inc();
    Json(json!(res))
}
