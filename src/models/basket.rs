use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Dishes are menu-scoped; drinks are offered every day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Dish,
    Drink,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Dish => write!(f, "Gericht"),
            ItemKind::Drink => write!(f, "Getränk"),
        }
    }
}

/// Body for POST /api/basket/validate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BasketValidationRequest {
    #[serde(default)]
    pub items: Vec<BasketDishRequest>,
    #[serde(default)]
    pub drinks: Vec<BasketDrinkRequest>,
    pub desired_pickup_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasketDishRequest {
    pub dish_id: Option<i64>,
    pub quantity: Option<i32>,
    /// Menu date the dish was picked from; echoed back, never validated.
    pub origin_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasketDrinkRequest {
    pub drink_id: Option<i64>,
    pub quantity: Option<i32>,
    pub origin_date: Option<NaiveDate>,
}

/// One basket line after dropping lines without an item id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasketItem {
    pub id: i64,
    pub kind: ItemKind,
    pub quantity: i32,
    pub origin_date: Option<NaiveDate>,
}

impl BasketValidationRequest {
    /// Dish lines first, then drinks, in request order. Lines without an id are skipped.
    pub fn basket_items(&self) -> Vec<BasketItem> {
        let dishes = self.items.iter().filter_map(|line| {
            line.dish_id.map(|id| BasketItem {
                id,
                kind: ItemKind::Dish,
                quantity: line.quantity.unwrap_or(1),
                origin_date: line.origin_date,
            })
        });
        let drinks = self.drinks.iter().filter_map(|line| {
            line.drink_id.map(|id| BasketItem {
                id,
                kind: ItemKind::Drink,
                quantity: line.quantity.unwrap_or(1),
                origin_date: line.origin_date,
            })
        });
        dishes.chain(drinks).collect()
    }

    pub fn dish_ids(&self) -> Vec<i64> {
        self.items.iter().filter_map(|l| l.dish_id).collect()
    }

    pub fn drink_ids(&self) -> Vec<i64> {
        self.drinks.iter().filter_map(|l| l.drink_id).collect()
    }

    /// Number of lines that carried no item id.
    pub fn malformed_lines(&self) -> usize {
        self.items.iter().filter(|l| l.dish_id.is_none()).count()
            + self.drinks.iter().filter(|l| l.drink_id.is_none()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemValidation {
    pub item_id: i64,
    pub kind: ItemKind,
    /// `None` when the id is unknown to the catalog.
    pub name: Option<String>,
    pub available_on_desired_date: bool,
    pub alternative_dates: Vec<NaiveDate>,
    pub origin_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateConflict {
    pub date: NaiveDate,
    /// Items whose availability starts on `date` and that miss the desired date.
    pub item_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasketValidationResponse {
    pub valid: bool,
    pub recommended_date: NaiveDate,
    pub possible_dates: Vec<NaiveDate>,
    pub item_validations: Vec<ItemValidation>,
    pub message: String,
    pub has_conflicting_dates: bool,
    pub date_conflicts: Vec<DateConflict>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_without_ids_are_dropped() {
        let req: BasketValidationRequest = serde_json::from_str(
            r#"{
                "items": [{"dish_id": 4, "quantity": 2}, {"dish_id": null, "quantity": 1}],
                "drinks": [{"drink_id": 9}],
                "desired_pickup_date": "2026-10-20"
            }"#,
        )
        .unwrap();

        let items = req.basket_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, ItemKind::Dish);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].kind, ItemKind::Drink);
        assert_eq!(items[1].quantity, 1);
        assert_eq!(req.malformed_lines(), 1);
        assert_eq!(req.dish_ids(), vec![4]);
    }

    #[test]
    fn missing_lists_deserialize_as_empty() {
        let req: BasketValidationRequest = serde_json::from_str("{}").unwrap();
        assert!(req.basket_items().is_empty());
        assert!(req.desired_pickup_date.is_none());
    }
}
