use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    MockProvider,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::MockProvider => "mock_provider",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Kreditkarte",
            PaymentMethod::DebitCard => "Debitkarte",
            PaymentMethod::MockProvider => "Mock Provider",
        }
    }

    pub fn is_card(&self) -> bool {
        matches!(self, PaymentMethod::CreditCard | PaymentMethod::DebitCard)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub method: String,
    pub transaction_id: String,
    pub successful: bool,
    pub error_message: Option<String>,
}

/// Body for POST /api/payments/{order_id}.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub card_number: Option<String>,
    pub card_holder: Option<String>,
    pub card_cvv: Option<String>,
    pub card_expiry_month: Option<String>,
    pub card_expiry_year: Option<String>,
    /// Forces the mock provider's outcome.
    pub mock_payment_success: Option<bool>,
}

/// Parsed `transaction_id:<id>,status:<success|failed>` webhook body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub transaction_id: String,
    pub outcome: WebhookOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Success,
    Failed,
    /// Any other status string; acknowledged and ignored.
    Other(String),
}
