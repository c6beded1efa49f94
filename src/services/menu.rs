use std::collections::{BTreeSet, HashMap};

use chrono::{Duration, NaiveDate};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use crate::{
    errors::ServiceError,
    models::{
        dish::Dish,
        drink::Drink,
        menu::{MenuDay, MenuDayRequest, MenuDayResponse},
    },
};

#[derive(FromRow)]
struct DishOffer {
    menu_day_id: i64,
    #[sqlx(flatten)]
    dish: Dish,
}

#[derive(FromRow)]
struct DrinkOffer {
    menu_day_id: i64,
    #[sqlx(flatten)]
    drink: Drink,
}

/// First requested id that is not among `found`.
pub fn first_missing(requested: &[i64], found: &[i64]) -> Option<i64> {
    let found: BTreeSet<i64> = found.iter().copied().collect();
    requested.iter().copied().find(|id| !found.contains(id))
}

pub struct MenuService;

impl MenuService {
    pub async fn list_all(pool: &PgPool) -> Result<Vec<MenuDayResponse>, ServiceError> {
        let days = sqlx::query_as::<_, MenuDay>("SELECT id, date FROM menu_days ORDER BY date")
            .fetch_all(pool)
            .await?;
        Self::with_items(pool, days).await
    }

    pub async fn list_future(
        pool: &PgPool,
        today: NaiveDate,
    ) -> Result<Vec<MenuDayResponse>, ServiceError> {
        let days = sqlx::query_as::<_, MenuDay>(
            "SELECT id, date FROM menu_days WHERE date >= $1 ORDER BY date",
        )
        .bind(today)
        .fetch_all(pool)
        .await?;
        Self::with_items(pool, days).await
    }

    /// Menu days from `start` through `start + 6`.
    pub async fn week(
        pool: &PgPool,
        start: NaiveDate,
    ) -> Result<Vec<MenuDayResponse>, ServiceError> {
        let days = sqlx::query_as::<_, MenuDay>(
            "SELECT id, date FROM menu_days WHERE date BETWEEN $1 AND $2 ORDER BY date",
        )
        .bind(start)
        .bind(start + Duration::days(6))
        .fetch_all(pool)
        .await?;
        Self::with_items(pool, days).await
    }

    pub async fn get(pool: &PgPool, id: i64) -> Result<MenuDayResponse, ServiceError> {
        let day = sqlx::query_as::<_, MenuDay>("SELECT id, date FROM menu_days WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Menüplan"))?;
        Self::single(pool, day).await
    }

    pub async fn get_by_date(
        pool: &PgPool,
        date: NaiveDate,
    ) -> Result<MenuDayResponse, ServiceError> {
        let day = Self::find_by_date(pool, date)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Kein Menüplan für {date}")))?;
        Self::single(pool, day).await
    }

    pub async fn find_by_date(
        pool: &PgPool,
        date: NaiveDate,
    ) -> Result<Option<MenuDay>, sqlx::Error> {
        sqlx::query_as::<_, MenuDay>("SELECT id, date FROM menu_days WHERE date = $1")
            .bind(date)
            .fetch_optional(pool)
            .await
    }

    /// Dates of all menu days from `from` onwards, ascending.
    pub async fn future_dates(pool: &PgPool, from: NaiveDate) -> Result<Vec<NaiveDate>, sqlx::Error> {
        sqlx::query_scalar("SELECT date FROM menu_days WHERE date >= $1 ORDER BY date")
            .bind(from)
            .fetch_all(pool)
            .await
    }

    pub async fn create(pool: &PgPool, req: &MenuDayRequest) -> Result<MenuDayResponse, ServiceError> {
        if Self::find_by_date(pool, req.date).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Für {} existiert bereits ein Menüplan",
                req.date
            )));
        }
        Self::check_items_exist(pool, req).await?;

        let mut tx = pool.begin().await?;
        let day = sqlx::query_as::<_, MenuDay>(
            "INSERT INTO menu_days (date) VALUES ($1) RETURNING id, date",
        )
        .bind(req.date)
        .fetch_one(&mut *tx)
        .await?;
        Self::write_items(&mut tx, day.id, req).await?;
        tx.commit().await?;

        tracing::info!(menu_day_id = day.id, date = %day.date, "Menu day created");
        Self::single(pool, day).await
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        req: &MenuDayRequest,
    ) -> Result<MenuDayResponse, ServiceError> {
        if let Some(other) = Self::find_by_date(pool, req.date).await? {
            if other.id != id {
                return Err(ServiceError::Conflict(format!(
                    "Für {} existiert bereits ein Menüplan",
                    req.date
                )));
            }
        }
        Self::check_items_exist(pool, req).await?;

        let mut tx = pool.begin().await?;
        let day = sqlx::query_as::<_, MenuDay>(
            "UPDATE menu_days SET date = $1 WHERE id = $2 RETURNING id, date",
        )
        .bind(req.date)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::not_found("Menüplan"))?;

        sqlx::query("DELETE FROM menu_day_dishes WHERE menu_day_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM menu_day_drinks WHERE menu_day_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Self::write_items(&mut tx, id, req).await?;
        tx.commit().await?;

        Self::single(pool, day).await
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM menu_days WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found("Menüplan"));
        }
        Ok(())
    }

    async fn check_items_exist(pool: &PgPool, req: &MenuDayRequest) -> Result<(), ServiceError> {
        let dishes: Vec<i64> = sqlx::query_scalar("SELECT id FROM dishes WHERE id = ANY($1)")
            .bind(&req.dish_ids)
            .fetch_all(pool)
            .await?;
        if let Some(id) = first_missing(&req.dish_ids, &dishes) {
            return Err(ServiceError::NotFound(format!("Gericht {id} nicht gefunden")));
        }

        let drinks: Vec<i64> = sqlx::query_scalar("SELECT id FROM drinks WHERE id = ANY($1)")
            .bind(&req.drink_ids)
            .fetch_all(pool)
            .await?;
        if let Some(id) = first_missing(&req.drink_ids, &drinks) {
            return Err(ServiceError::NotFound(format!("Getränk {id} nicht gefunden")));
        }
        Ok(())
    }

    async fn write_items(
        tx: &mut Transaction<'_, Postgres>,
        menu_day_id: i64,
        req: &MenuDayRequest,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO menu_day_dishes (menu_day_id, dish_id)
             SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
        )
        .bind(menu_day_id)
        .bind(&req.dish_ids)
        .execute(&mut **tx)
        .await?;
        sqlx::query(
            "INSERT INTO menu_day_drinks (menu_day_id, drink_id)
             SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
        )
        .bind(menu_day_id)
        .bind(&req.drink_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn single(pool: &PgPool, day: MenuDay) -> Result<MenuDayResponse, ServiceError> {
        Self::with_items(pool, vec![day])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("Menüplan"))
    }

    /// Attach dishes and drinks to each day with two queries.
    async fn with_items(
        pool: &PgPool,
        days: Vec<MenuDay>,
    ) -> Result<Vec<MenuDayResponse>, ServiceError> {
        let ids: Vec<i64> = days.iter().map(|d| d.id).collect();

        let dish_offers = sqlx::query_as::<_, DishOffer>(
            "SELECT mdd.menu_day_id, d.id, d.name, d.description, d.price, d.vegetarian,
                    d.vegan, d.ingredients, d.allergens, d.image_url
             FROM menu_day_dishes mdd
             JOIN dishes d ON d.id = mdd.dish_id
             WHERE mdd.menu_day_id = ANY($1)
             ORDER BY d.name",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let drink_offers = sqlx::query_as::<_, DrinkOffer>(
            "SELECT mdr.menu_day_id, d.id, d.name, d.description, d.price, d.stock,
                    d.image_url, d.available
             FROM menu_day_drinks mdr
             JOIN drinks d ON d.id = mdr.drink_id
             WHERE mdr.menu_day_id = ANY($1)
             ORDER BY d.name",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut dishes: HashMap<i64, Vec<Dish>> = HashMap::new();
        for offer in dish_offers {
            dishes.entry(offer.menu_day_id).or_default().push(offer.dish);
        }
        let mut drinks: HashMap<i64, Vec<Drink>> = HashMap::new();
        for offer in drink_offers {
            drinks.entry(offer.menu_day_id).or_default().push(offer.drink);
        }

        Ok(days
            .into_iter()
            .map(|day| MenuDayResponse {
                id: day.id,
                date: day.date,
                dishes: dishes.remove(&day.id).unwrap_or_default(),
                drinks: drinks.remove(&day.id).unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_the_first_unknown_id() {
        assert_eq!(first_missing(&[1, 2, 3], &[3, 1]), Some(2));
        assert_eq!(first_missing(&[1, 2], &[2, 1]), None);
        assert_eq!(first_missing(&[], &[]), None);
    }
}
