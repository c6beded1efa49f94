use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::AppState;

/// Extractor that validates the `X-Webhook-Secret` header against
/// `config.payment_webhook_secret`. Requests are refused while no secret is configured.
pub struct WebhookAuth;

impl FromRequestParts<AppState> for WebhookAuth {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .config
            .payment_webhook_secret
            .as_deref()
            .ok_or((StatusCode::SERVICE_UNAVAILABLE, "Payment webhook disabled"))?;

        let key = parts
            .headers
            .get("X-Webhook-Secret")
            .and_then(|v| v.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing X-Webhook-Secret header"))?;

        if key != expected {
            return Err((StatusCode::UNAUTHORIZED, "Invalid webhook secret"));
        }

        Ok(WebhookAuth)
    }
}
