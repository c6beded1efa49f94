use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::{
        order::PaymentStatus,
        payment::{Payment, PaymentMethod, PaymentRequest, WebhookEvent, WebhookOutcome},
    },
    services::{email::EmailService, metrics::PAYMENTS_COUNTER, orders::OrderService},
};

const PAYMENT_COLUMNS: &str =
    "id, order_id, amount, created_at, method, transaction_id, successful, error_message";

pub const MSG_ALREADY_PAID: &str = "Diese Bestellung wurde bereits bezahlt";

/// Card numbers with this prefix are declined by the simulated acquirer.
const DECLINED_CARD_PREFIX: &str = "4000";

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Card payments need every card field.
pub fn validate_payment_method(req: &PaymentRequest) -> Result<(), String> {
    if !req.method.is_card() {
        return Ok(());
    }
    let method = req.method.display_name();
    if blank(&req.card_number) {
        return Err(format!("Kartennummer ist erforderlich für {method}"));
    }
    if blank(&req.card_holder) {
        return Err(format!("Karteninhaber ist erforderlich für {method}"));
    }
    if blank(&req.card_cvv) {
        return Err(format!("CVV ist erforderlich für {method}"));
    }
    if blank(&req.card_expiry_month) || blank(&req.card_expiry_year) {
        return Err(format!("Ablaufdatum ist erforderlich für {method}"));
    }
    Ok(())
}

/// Outcome of the simulated payment provider.
pub fn simulate_payment(req: &PaymentRequest) -> bool {
    match req.method {
        PaymentMethod::CreditCard | PaymentMethod::DebitCard => !req
            .card_number
            .as_deref()
            .is_some_and(|n| n.trim().starts_with(DECLINED_CARD_PREFIX)),
        PaymentMethod::MockProvider => match req.mock_payment_success {
            Some(forced) => forced,
            None => req.amount.fract() != Decimal::new(13, 2),
        },
    }
}

/// Parse `transaction_id:<id>,status:<status>`.
pub fn parse_webhook(payload: &str) -> Result<WebhookEvent, String> {
    let mut transaction_id = None;
    let mut status = None;
    for part in payload.trim().split(',') {
        let (key, value) = part
            .split_once(':')
            .ok_or_else(|| format!("Ungültiges Webhook-Feld: {part}"))?;
        match key.trim() {
            "transaction_id" => transaction_id = Some(value.trim().to_string()),
            "status" => status = Some(value.trim().to_string()),
            _ => {}
        }
    }

    let transaction_id = transaction_id
        .filter(|id| !id.is_empty())
        .ok_or("Webhook ohne transaction_id")?;
    let outcome = match status.ok_or("Webhook ohne status")?.as_str() {
        "success" => WebhookOutcome::Success,
        "failed" => WebhookOutcome::Failed,
        other => WebhookOutcome::Other(other.to_string()),
    };
    Ok(WebhookEvent {
        transaction_id,
        outcome,
    })
}

pub struct PaymentService;

impl PaymentService {
    pub async fn process(
        pool: &PgPool,
        email: Option<Arc<EmailService>>,
        order_id: i64,
        user_id: i64,
        req: &PaymentRequest,
    ) -> Result<Payment, ServiceError> {
        let order = OrderService::get(pool, order_id).await?;
        if order.user_id != user_id {
            return Err(ServiceError::Forbidden("Keine Berechtigung für diese Bestellung".into()));
        }
        if order.payment_status == PaymentStatus::Paid {
            return Err(ServiceError::Conflict(MSG_ALREADY_PAID.into()));
        }
        if req.amount != order.total_price {
            return Err(ServiceError::BadRequest(
                "Der Zahlungsbetrag stimmt nicht mit dem Bestellungsbetrag überein".into(),
            ));
        }
        validate_payment_method(req).map_err(ServiceError::BadRequest)?;

        let transaction_id = Uuid::new_v4().to_string();
        let successful = simulate_payment(req);

        let mut tx = pool.begin().await?;
        // Lock the order so concurrent payments for it run one after the other.
        let current: String =
            sqlx::query_scalar("SELECT payment_status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id)
                .fetch_one(&mut *tx)
                .await?;
        if current == PaymentStatus::Paid.as_str() {
            return Err(ServiceError::Conflict(MSG_ALREADY_PAID.into()));
        }

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO payments (order_id, amount, method, transaction_id, successful, error_message)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(order_id)
        .bind(req.amount)
        .bind(req.method.as_str())
        .bind(&transaction_id)
        .bind(successful)
        .bind((!successful).then_some("Zahlung fehlgeschlagen"))
        .fetch_one(&mut *tx)
        .await?;

        if successful {
            sqlx::query("UPDATE orders SET payment_status = $1, payment_reference = $2 WHERE id = $3")
                .bind(PaymentStatus::Paid.as_str())
                .bind(&transaction_id)
                .bind(order_id)
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query("UPDATE orders SET payment_status = $1 WHERE id = $2")
                .bind(PaymentStatus::Pending.as_str())
                .bind(order_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        let outcome = if successful { "success" } else { "failed" };
        PAYMENTS_COUNTER
            .with_label_values(&[req.method.as_str(), outcome])
            .inc();
        tracing::info!(order_id, %transaction_id, outcome, "Payment processed");

        if successful {
            Self::send_confirmation(pool, email, order_id);
        }
        Ok(payment)
    }

    /// Latest payment of an order owned by `user_id`.
    pub async fn get_for_order(
        pool: &PgPool,
        order_id: i64,
        user_id: i64,
    ) -> Result<Payment, ServiceError> {
        let order = OrderService::get(pool, order_id).await?;
        if order.user_id != user_id {
            return Err(ServiceError::Forbidden("Keine Berechtigung für diese Bestellung".into()));
        }
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(order_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Keine Zahlung für diese Bestellung gefunden".into()))
    }

    pub async fn handle_webhook(
        pool: &PgPool,
        email: Option<Arc<EmailService>>,
        payload: &str,
    ) -> Result<(), ServiceError> {
        let event = parse_webhook(payload).map_err(ServiceError::BadRequest)?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE transaction_id = $1"
        ))
        .bind(&event.transaction_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound("Keine Zahlung mit dieser Transaktions-ID gefunden".into())
        })?;

        match event.outcome {
            WebhookOutcome::Success => {
                if payment.successful {
                    return Ok(());
                }
                let mut tx = pool.begin().await?;
                sqlx::query("UPDATE payments SET successful = TRUE, error_message = NULL WHERE id = $1")
                    .bind(payment.id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(
                    "UPDATE orders SET payment_status = $1, payment_reference = $2 WHERE id = $3",
                )
                .bind(PaymentStatus::Paid.as_str())
                .bind(&payment.transaction_id)
                .bind(payment.order_id)
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;
                tracing::info!(order_id = payment.order_id, "Payment confirmed by webhook");
                Self::send_confirmation(pool, email, payment.order_id);
            }
            WebhookOutcome::Failed => {
                let mut tx = pool.begin().await?;
                sqlx::query("UPDATE payments SET successful = FALSE, error_message = $1 WHERE id = $2")
                    .bind("Zahlung fehlgeschlagen laut Webhook")
                    .bind(payment.id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("UPDATE orders SET payment_status = $1 WHERE id = $2")
                    .bind(PaymentStatus::Pending.as_str())
                    .bind(payment.order_id)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                tracing::warn!(order_id = payment.order_id, "Payment failed according to webhook");
            }
            WebhookOutcome::Other(status) => {
                tracing::info!(%status, "Ignoring webhook status");
            }
        }
        Ok(())
    }

    fn send_confirmation(pool: &PgPool, email: Option<Arc<EmailService>>, order_id: i64) {
        let Some(svc) = email else { return };
        let pool = pool.clone();
        tokio::spawn(async move {
            let result = match OrderService::get(&pool, order_id).await {
                Ok(order) => svc.send_payment_confirmation(&order).await,
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            };
            if let Err(e) = result {
                tracing::warn!("Failed to send payment confirmation: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str) -> PaymentRequest {
        PaymentRequest {
            method: PaymentMethod::CreditCard,
            amount: Decimal::new(1250, 2),
            card_number: Some(number.into()),
            card_holder: Some("Lea Meier".into()),
            card_cvv: Some("123".into()),
            card_expiry_month: Some("09".into()),
            card_expiry_year: Some("2028".into()),
            mock_payment_success: None,
        }
    }

    fn mock(amount: Decimal, forced: Option<bool>) -> PaymentRequest {
        PaymentRequest {
            method: PaymentMethod::MockProvider,
            amount,
            card_number: None,
            card_holder: None,
            card_cvv: None,
            card_expiry_month: None,
            card_expiry_year: None,
            mock_payment_success: forced,
        }
    }

    #[test]
    fn card_payments_need_all_fields() {
        assert!(validate_payment_method(&card("4242424242424242")).is_ok());

        let mut req = card("4242424242424242");
        req.card_cvv = Some("  ".into());
        assert_eq!(
            validate_payment_method(&req).unwrap_err(),
            "CVV ist erforderlich für Kreditkarte"
        );

        let mut req = card("4242424242424242");
        req.card_expiry_year = None;
        assert!(validate_payment_method(&req).unwrap_err().starts_with("Ablaufdatum"));

        assert!(validate_payment_method(&mock(Decimal::ONE, None)).is_ok());
    }

    #[test]
    fn declined_prefix_fails() {
        assert!(simulate_payment(&card("4242424242424242")));
        assert!(!simulate_payment(&card("4000123412341234")));
    }

    #[test]
    fn mock_provider_outcomes() {
        assert!(simulate_payment(&mock(Decimal::new(1250, 2), None)));
        assert!(!simulate_payment(&mock(Decimal::new(1013, 2), None)));
        assert!(simulate_payment(&mock(Decimal::new(1013, 2), Some(true))));
        assert!(!simulate_payment(&mock(Decimal::new(1250, 2), Some(false))));
    }

    #[test]
    fn parses_webhook_payloads() {
        assert_eq!(
            parse_webhook("transaction_id:abc-1,status:success").unwrap(),
            WebhookEvent {
                transaction_id: "abc-1".into(),
                outcome: WebhookOutcome::Success,
            }
        );
        assert_eq!(
            parse_webhook(" transaction_id: abc-2 , status: failed ").unwrap().outcome,
            WebhookOutcome::Failed
        );
        assert_eq!(
            parse_webhook("transaction_id:x,status:refunded").unwrap().outcome,
            WebhookOutcome::Other("refunded".into())
        );
        assert!(parse_webhook("garbage").is_err());
        assert!(parse_webhook("status:success").is_err());
        assert!(parse_webhook("transaction_id:,status:success").is_err());
    }

    #[tokio::test]
    async fn concurrent_payments_record_one_success() {
        let Some(pool) = crate::services::fixtures::pool().await else {
            return;
        };
        let placed = crate::services::fixtures::place_order(&pool, 5, 1).await;
        let req = mock(placed.order.total_price, Some(true));

        let (a, b) = tokio::join!(
            PaymentService::process(&pool, None, placed.order.id, placed.user_id, &req),
            PaymentService::process(&pool, None, placed.order.id, placed.user_id, &req),
        );
        assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
        let err = if a.is_err() { a } else { b };
        assert!(matches!(err, Err(ServiceError::Conflict(m)) if m == MSG_ALREADY_PAID));

        let successes: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM payments WHERE order_id = $1 AND successful",
        )
        .bind(placed.order.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(successes, 1);
    }
}
