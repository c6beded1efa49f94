use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dish {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub vegetarian: bool,
    pub vegan: bool,
    pub ingredients: Vec<String>,
    pub allergens: Vec<String>,
    pub image_url: Option<String>,
}

/// Body for POST /api/dishes and PUT /api/dishes/{id}.
#[derive(Debug, Deserialize)]
pub struct DishRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub vegetarian: bool,
    #[serde(default)]
    pub vegan: bool,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
    pub image_url: Option<String>,
}

impl DishRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name darf nicht leer sein".into());
        }
        if self.price <= Decimal::ZERO {
            return Err("Preis muss positiv sein".into());
        }
        Ok(())
    }
}

/// Query params for GET /api/dishes.
#[derive(Debug, Default, Deserialize)]
pub struct DishFilter {
    #[serde(default)]
    pub vegetarian: bool,
    #[serde(default)]
    pub vegan: bool,
}

/// Query params for GET /api/dishes/{id}/with-alternatives.
#[derive(Debug, Deserialize)]
pub struct AlternativesQuery {
    pub origin_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct DishWithDates {
    pub dish: Dish,
    pub available_dates: Vec<NaiveDate>,
    pub origin_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, price: Decimal) -> DishRequest {
        DishRequest {
            name: name.into(),
            description: None,
            price,
            vegetarian: false,
            vegan: false,
            ingredients: vec![],
            allergens: vec![],
            image_url: None,
        }
    }

    #[test]
    fn rejects_blank_name_and_non_positive_price() {
        assert!(request("  ", Decimal::new(1250, 2)).validate().is_err());
        assert!(request("Rösti", Decimal::ZERO).validate().is_err());
        assert!(request("Rösti", Decimal::new(1250, 2)).validate().is_ok());
    }
}
