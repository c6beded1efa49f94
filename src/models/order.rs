use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    InPreparation,
    Ready,
    PickedUp,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::InPreparation => "in_preparation",
            OrderStatus::Ready => "ready",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::New,
        OrderStatus::InPreparation,
        OrderStatus::Ready,
        OrderStatus::PickedUp,
        OrderStatus::Cancelled,
    ];
}

impl std::str::FromStr for OrderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unbekannter Bestellstatus: {s}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Unbekannter Zahlungsstatus: {s}")),
        }
    }
}

/// DB row; status columns are TEXT and parsed when building responses.
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub pickup_date: NaiveDate,
    pub pickup_time: NaiveTime,
    pub order_date: NaiveDate,
    pub total_price: Decimal,
    pub status: String,
    pub payment_status: String,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
}

impl Order {
    pub fn status(&self) -> OrderStatus {
        self.status.parse().unwrap_or(OrderStatus::New)
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status.parse().unwrap_or(PaymentStatus::Pending)
    }
}

/// Order line joined with the dish or drink name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub dish_id: Option<i64>,
    pub drink_id: Option<i64>,
    pub item_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderLineResponse {
    #[serde(flatten)]
    pub line: OrderLine,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: i64,
    pub user_email: String,
    pub user_name: String,
    pub pickup_date: NaiveDate,
    pub pickup_time: NaiveTime,
    pub order_date: NaiveDate,
    pub lines: Vec<OrderLineResponse>,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
}

/// Body for POST /api/orders and POST /api/orders/validate.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    pub pickup_date: NaiveDate,
    pub pickup_time: NaiveTime,
    #[serde(default)]
    pub positions: Vec<OrderPositionRequest>,
    #[serde(default)]
    pub drinks: Vec<OrderDrinkRequest>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderPositionRequest {
    pub dish_id: Option<i64>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderDrinkRequest {
    pub drink_id: Option<i64>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnavailableProduct {
    pub dish_id: i64,
    pub dish_name: String,
    pub desired_date: NaiveDate,
    pub available_dates: Vec<NaiveDate>,
}

/// Outcome of POST /api/orders/validate: either the created order or why it was not created.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderValidationResponse {
    pub success: bool,
    pub message: String,
    pub order: Option<OrderResponse>,
    pub unavailable_products: Vec<UnavailableProduct>,
    pub recommended_date: Option<NaiveDate>,
    pub possible_dates: Vec<NaiveDate>,
}

impl OrderValidationResponse {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateQuery {
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_parse_from_their_column_text() {
        for st in OrderStatus::ALL {
            assert_eq!(st.as_str().parse::<OrderStatus>().unwrap(), st);
        }
        assert_eq!("paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert!("NEU".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn line_total_multiplies_unit_price() {
        let line = OrderLine {
            id: 1,
            order_id: 1,
            dish_id: Some(2),
            drink_id: None,
            item_name: "Käse-Spätzle".into(),
            quantity: 3,
            unit_price: Decimal::new(1350, 2),
        };
        assert_eq!(line.line_total(), Decimal::new(4050, 2));
    }
}
