use chrono::{Duration, NaiveDate};

use crate::models::basket::ItemKind;

/// Drinks are orderable today and on each of the following six days.
pub const DRINK_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AvailabilityError {
    #[error("{kind} {id} nicht gefunden")]
    NotFound { kind: ItemKind, id: i64 },

    #[error("Katalogabfrage fehlgeschlagen: {0}")]
    Lookup(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: i64,
    pub kind: ItemKind,
    pub name: String,
}

/// Read access to the dish/drink catalog and the menu calendar.
pub trait ItemCatalog {
    fn find_item(&self, kind: ItemKind, id: i64) -> Result<Option<CatalogItem>, AvailabilityError>;

    /// Dates on or after `from` whose menu offers `dish_id`.
    fn dish_dates_from(&self, dish_id: i64, from: NaiveDate)
        -> Result<Vec<NaiveDate>, AvailabilityError>;
}

/// Stands in for a snapshot that could not be loaded; every lookup fails with `reason`.
#[derive(Debug, Clone)]
pub struct UnreachableCatalog {
    pub reason: String,
}

impl ItemCatalog for UnreachableCatalog {
    fn find_item(&self, _kind: ItemKind, _id: i64) -> Result<Option<CatalogItem>, AvailabilityError> {
        Err(AvailabilityError::Lookup(self.reason.clone()))
    }

    fn dish_dates_from(
        &self,
        _dish_id: i64,
        _from: NaiveDate,
    ) -> Result<Vec<NaiveDate>, AvailabilityError> {
        Err(AvailabilityError::Lookup(self.reason.clone()))
    }
}

/// A catalog item together with its availability window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub name: String,
    pub window: Vec<NaiveDate>,
}

/// Fixed forward window for drinks: `today ..= today + 6`.
pub fn drink_window(today: NaiveDate) -> Vec<NaiveDate> {
    (0..DRINK_WINDOW_DAYS)
        .map(|offset| today + Duration::days(offset))
        .collect()
}

pub struct AvailabilityResolver<'a, C: ?Sized> {
    catalog: &'a C,
    today: NaiveDate,
}

impl<'a, C: ItemCatalog + ?Sized> AvailabilityResolver<'a, C> {
    pub fn new(catalog: &'a C, today: NaiveDate) -> Self {
        Self { catalog, today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Look the item up once, then compute its window.
    /// Dish windows are ascending, deduplicated and never before today.
    pub fn resolve(&self, kind: ItemKind, id: i64) -> Result<ResolvedItem, AvailabilityError> {
        let item = self
            .catalog
            .find_item(kind, id)?
            .ok_or(AvailabilityError::NotFound { kind, id })?;

        let window = match kind {
            ItemKind::Dish => {
                let mut dates = self.catalog.dish_dates_from(id, self.today)?;
                dates.retain(|d| *d >= self.today);
                dates.sort_unstable();
                dates.dedup();
                dates
            }
            ItemKind::Drink => drink_window(self.today),
        };

        Ok(ResolvedItem {
            name: item.name,
            window,
        })
    }

    pub fn available_dates(
        &self,
        kind: ItemKind,
        id: i64,
    ) -> Result<Vec<NaiveDate>, AvailabilityError> {
        self.resolve(kind, id).map(|resolved| resolved.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::calendar::MenuCalendar;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap() + Duration::days(n)
    }

    #[test]
    fn dish_window_is_menu_driven_and_starts_today() {
        let mut cal = MenuCalendar::new();
        cal.add_dish(1, "Gemüse-Curry");
        cal.offer_dish(day(-2), 1);
        cal.offer_dish(day(4), 1);
        cal.offer_dish(day(0), 1);

        let resolver = AvailabilityResolver::new(&cal, day(0));
        let dates = resolver.available_dates(ItemKind::Dish, 1).unwrap();
        assert_eq!(dates, vec![day(0), day(4)]);
    }

    #[test]
    fn drink_window_ignores_menu_data() {
        let mut cal = MenuCalendar::new();
        cal.add_drink(7, "Eistee");

        let resolver = AvailabilityResolver::new(&cal, day(0));
        let dates = resolver.available_dates(ItemKind::Drink, 7).unwrap();
        assert_eq!(dates.len(), 7);
        assert_eq!(dates.first(), Some(&day(0)));
        assert_eq!(dates.last(), Some(&day(6)));
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let cal = MenuCalendar::new();
        let resolver = AvailabilityResolver::new(&cal, day(0));
        assert_eq!(
            resolver.resolve(ItemKind::Dish, 42),
            Err(AvailabilityError::NotFound { kind: ItemKind::Dish, id: 42 })
        );
        assert!(resolver.resolve(ItemKind::Drink, 42).is_err());
    }

    #[test]
    fn dish_without_future_menus_has_empty_window() {
        let mut cal = MenuCalendar::new();
        cal.add_dish(3, "Wiener Schnitzel");
        cal.offer_dish(day(-1), 3);

        let resolver = AvailabilityResolver::new(&cal, day(0));
        assert!(resolver.available_dates(ItemKind::Dish, 3).unwrap().is_empty());
    }
}
