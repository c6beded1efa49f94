use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{dish::Dish, drink::Drink};

/// One calendar date's menu row; the offered items live in the join tables.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MenuDay {
    pub id: i64,
    pub date: NaiveDate,
}

/// Body for POST /api/menu-days and PUT /api/menu-days/{id}.
#[derive(Debug, Deserialize)]
pub struct MenuDayRequest {
    pub date: NaiveDate,
    pub dish_ids: Vec<i64>,
    #[serde(default)]
    pub drink_ids: Vec<i64>,
}

/// A menu day with its dishes and drinks resolved.
#[derive(Debug, Clone, Serialize)]
pub struct MenuDayResponse {
    pub id: i64,
    pub date: NaiveDate,
    pub dishes: Vec<Dish>,
    pub drinks: Vec<Drink>,
}

/// Query params for GET /api/menu/week.
#[derive(Debug, Deserialize)]
pub struct MenuWeekQuery {
    /// First day of the seven-day window (ISO 8601 date, e.g. "2025-06-02").
    pub start: NaiveDate,
}
