use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{
    models::basket::ItemKind,
    services::availability::{AvailabilityError, CatalogItem, ItemCatalog},
};

/// The items offered on one date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub dish_ids: BTreeSet<i64>,
    pub drink_ids: BTreeSet<i64>,
}

/// In-memory snapshot of the menu calendar plus the names of the items it refers to.
///
/// Days live in an arena indexed by date, so there is at most one day per date.
#[derive(Debug, Clone, Default)]
pub struct MenuCalendar {
    days: Vec<CalendarDay>,
    by_date: BTreeMap<NaiveDate, usize>,
    dishes: HashMap<i64, String>,
    drinks: HashMap<i64, String>,
}

impl MenuCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dish(&mut self, id: i64, name: impl Into<String>) {
        self.dishes.insert(id, name.into());
    }

    pub fn add_drink(&mut self, id: i64, name: impl Into<String>) {
        self.drinks.insert(id, name.into());
    }

    fn day_mut(&mut self, date: NaiveDate) -> &mut CalendarDay {
        let idx = match self.by_date.get(&date) {
            Some(&idx) => idx,
            None => {
                self.days.push(CalendarDay {
                    date,
                    ..Default::default()
                });
                let idx = self.days.len() - 1;
                self.by_date.insert(date, idx);
                idx
            }
        };
        &mut self.days[idx]
    }

    pub fn offer_dish(&mut self, date: NaiveDate, dish_id: i64) {
        self.day_mut(date).dish_ids.insert(dish_id);
    }

    pub fn offer_drink(&mut self, date: NaiveDate, drink_id: i64) {
        self.day_mut(date).drink_ids.insert(drink_id);
    }

    pub fn day(&self, date: NaiveDate) -> Option<&CalendarDay> {
        self.by_date.get(&date).map(|&idx| &self.days[idx])
    }

    /// Ascending dates on or after `from` whose menu contains `dish_id`.
    pub fn dates_containing_dish(&self, dish_id: i64, from: NaiveDate) -> Vec<NaiveDate> {
        self.by_date
            .range(from..)
            .filter(|(_, &idx)| self.days[idx].dish_ids.contains(&dish_id))
            .map(|(date, _)| *date)
            .collect()
    }
}

impl ItemCatalog for MenuCalendar {
    fn find_item(&self, kind: ItemKind, id: i64) -> Result<Option<CatalogItem>, AvailabilityError> {
        let names = match kind {
            ItemKind::Dish => &self.dishes,
            ItemKind::Drink => &self.drinks,
        };
        Ok(names.get(&id).map(|name| CatalogItem {
            id,
            kind,
            name: name.clone(),
        }))
    }

    fn dish_dates_from(
        &self,
        dish_id: i64,
        from: NaiveDate,
    ) -> Result<Vec<NaiveDate>, AvailabilityError> {
        Ok(self.dates_containing_dish(dish_id, from))
    }
}

pub struct CalendarRepository;

impl CalendarRepository {
    /// Load the requested items and every menu day from `from` onwards that offers one of
    /// them, inside a single read-only repeatable-read transaction.
    pub async fn load(
        pool: &PgPool,
        dish_ids: &[i64],
        drink_ids: &[i64],
        from: NaiveDate,
    ) -> Result<MenuCalendar, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let dishes: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM dishes WHERE id = ANY($1)")
                .bind(dish_ids)
                .fetch_all(&mut *tx)
                .await?;

        let drinks: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM drinks WHERE id = ANY($1)")
                .bind(drink_ids)
                .fetch_all(&mut *tx)
                .await?;

        let dish_offers: Vec<(NaiveDate, i64)> = sqlx::query_as(
            "SELECT md.date, mdd.dish_id
             FROM menu_days md
             JOIN menu_day_dishes mdd ON mdd.menu_day_id = md.id
             WHERE md.date >= $1 AND mdd.dish_id = ANY($2)
             ORDER BY md.date",
        )
        .bind(from)
        .bind(dish_ids)
        .fetch_all(&mut *tx)
        .await?;

        let drink_offers: Vec<(NaiveDate, i64)> = sqlx::query_as(
            "SELECT md.date, mdr.drink_id
             FROM menu_days md
             JOIN menu_day_drinks mdr ON mdr.menu_day_id = md.id
             WHERE md.date >= $1 AND mdr.drink_id = ANY($2)
             ORDER BY md.date",
        )
        .bind(from)
        .bind(drink_ids)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut calendar = MenuCalendar::new();
        for (id, name) in dishes {
            calendar.add_dish(id, name);
        }
        for (id, name) in drinks {
            calendar.add_drink(id, name);
        }
        for (date, dish_id) in dish_offers {
            calendar.offer_dish(date, dish_id);
        }
        for (date, drink_id) in drink_offers {
            calendar.offer_drink(date, drink_id);
        }
        Ok(calendar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn one_day_per_date() {
        let mut cal = MenuCalendar::new();
        cal.offer_dish(date(20), 1);
        cal.offer_dish(date(20), 2);
        cal.offer_drink(date(20), 5);

        let day = cal.day(date(20)).unwrap();
        assert_eq!(day.dish_ids.len(), 2);
        assert_eq!(day.drink_ids.len(), 1);
        assert!(cal.day(date(21)).is_none());
    }

    #[test]
    fn dates_are_ascending_and_filtered() {
        let mut cal = MenuCalendar::new();
        cal.offer_dish(date(25), 1);
        cal.offer_dish(date(18), 1);
        cal.offer_dish(date(21), 1);
        cal.offer_dish(date(22), 2);

        assert_eq!(cal.dates_containing_dish(1, date(19)), vec![date(21), date(25)]);
        assert_eq!(cal.dates_containing_dish(2, date(19)), vec![date(22)]);
    }
}
