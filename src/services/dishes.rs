use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{
    errors::ServiceError,
    models::{
        basket::ItemKind,
        dish::{Dish, DishFilter, DishRequest, DishWithDates},
    },
    services::{
        availability::{AvailabilityError, AvailabilityResolver},
        calendar::CalendarRepository,
    },
};

const DISH_COLUMNS: &str =
    "id, name, description, price, vegetarian, vegan, ingredients, allergens, image_url";

pub struct DishService;

impl DishService {
    pub async fn list(pool: &PgPool, filter: &DishFilter) -> Result<Vec<Dish>, ServiceError> {
        let dishes = sqlx::query_as::<_, Dish>(&format!(
            "SELECT {DISH_COLUMNS} FROM dishes
             WHERE ($1 = FALSE OR vegetarian) AND ($2 = FALSE OR vegan)
             ORDER BY name"
        ))
        .bind(filter.vegetarian)
        .bind(filter.vegan)
        .fetch_all(pool)
        .await?;
        Ok(dishes)
    }

    pub async fn get(pool: &PgPool, id: i64) -> Result<Dish, ServiceError> {
        sqlx::query_as::<_, Dish>(&format!("SELECT {DISH_COLUMNS} FROM dishes WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Gericht"))
    }

    /// Dishes on the menu for `date`; empty when no menu day exists.
    pub async fn on_date(pool: &PgPool, date: NaiveDate) -> Result<Vec<Dish>, ServiceError> {
        let dishes = sqlx::query_as::<_, Dish>(
            "SELECT d.id, d.name, d.description, d.price, d.vegetarian, d.vegan,
                    d.ingredients, d.allergens, d.image_url
             FROM dishes d
             JOIN menu_day_dishes mdd ON mdd.dish_id = d.id
             JOIN menu_days md ON md.id = mdd.menu_day_id
             WHERE md.date = $1
             ORDER BY d.name",
        )
        .bind(date)
        .fetch_all(pool)
        .await?;
        Ok(dishes)
    }

    /// Future dates on which the dish is on the menu.
    pub async fn available_dates(
        pool: &PgPool,
        id: i64,
        today: NaiveDate,
    ) -> Result<Vec<NaiveDate>, ServiceError> {
        let calendar = CalendarRepository::load(pool, &[id], &[], today).await?;
        AvailabilityResolver::new(&calendar, today)
            .available_dates(ItemKind::Dish, id)
            .map_err(|e| match e {
                AvailabilityError::NotFound { .. } => ServiceError::not_found("Gericht"),
                AvailabilityError::Lookup(msg) => ServiceError::Internal(anyhow::anyhow!(msg)),
            })
    }

    pub async fn with_alternatives(
        pool: &PgPool,
        id: i64,
        origin_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<DishWithDates, ServiceError> {
        let dish = Self::get(pool, id).await?;
        let available_dates = Self::available_dates(pool, id, today).await?;
        Ok(DishWithDates {
            dish,
            available_dates,
            origin_date,
        })
    }

    pub async fn create(pool: &PgPool, req: &DishRequest) -> Result<Dish, ServiceError> {
        req.validate().map_err(ServiceError::BadRequest)?;
        let dish = sqlx::query_as::<_, Dish>(&format!(
            "INSERT INTO dishes (name, description, price, vegetarian, vegan, ingredients, allergens, image_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {DISH_COLUMNS}"
        ))
        .bind(req.name.trim())
        .bind(&req.description)
        .bind(req.price)
        .bind(req.vegetarian)
        .bind(req.vegan)
        .bind(&req.ingredients)
        .bind(&req.allergens)
        .bind(&req.image_url)
        .fetch_one(pool)
        .await?;
        tracing::info!(dish_id = dish.id, "Dish created");
        Ok(dish)
    }

    pub async fn update(pool: &PgPool, id: i64, req: &DishRequest) -> Result<Dish, ServiceError> {
        req.validate().map_err(ServiceError::BadRequest)?;
        sqlx::query_as::<_, Dish>(&format!(
            "UPDATE dishes SET name = $1, description = $2, price = $3, vegetarian = $4,
                    vegan = $5, ingredients = $6, allergens = $7, image_url = $8
             WHERE id = $9
             RETURNING {DISH_COLUMNS}"
        ))
        .bind(req.name.trim())
        .bind(&req.description)
        .bind(req.price)
        .bind(req.vegetarian)
        .bind(req.vegan)
        .bind(&req.ingredients)
        .bind(&req.allergens)
        .bind(&req.image_url)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Gericht"))
    }

    /// Removes the dish from all menu days as well.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM dishes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found("Gericht"));
        }
        tracing::info!(dish_id = id, "Dish deleted");
        Ok(())
    }
}
