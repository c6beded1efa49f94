use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Drink {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub available: bool,
}

impl Drink {
    /// Whether `quantity` units can be sold right now.
    pub fn can_sell(&self, quantity: i32) -> bool {
        self.available && self.stock >= quantity
    }
}

#[derive(Debug, Deserialize)]
pub struct DrinkRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl DrinkRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name darf nicht leer sein".into());
        }
        if self.price <= Decimal::ZERO {
            return Err("Preis muss positiv sein".into());
        }
        if self.stock < 0 {
            return Err("Vorrat darf nicht negativ sein".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub stock: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_sell_needs_flag_and_stock() {
        let mut drink = Drink {
            id: 1,
            name: "Mineralwasser".into(),
            description: None,
            price: Decimal::new(250, 2),
            stock: 3,
            image_url: None,
            available: true,
        };
        assert!(drink.can_sell(3));
        assert!(!drink.can_sell(4));
        drink.available = false;
        assert!(!drink.can_sell(1));
    }

    #[test]
    fn available_defaults_to_true() {
        let req: DrinkRequest =
            serde_json::from_str(r#"{"name":"Cola","price":"3.20","stock":10}"#).unwrap();
        assert!(req.available);
        assert!(req.validate().is_ok());
    }
}
