use sqlx::PgPool;

use crate::{
    errors::ServiceError,
    models::drink::{Drink, DrinkRequest},
};

const DRINK_COLUMNS: &str = "id, name, description, price, stock, image_url, available";

/// Availability flag after a stock change: empty stock is never sellable.
pub fn availability_for_stock(stock: i32, requested: bool) -> bool {
    stock > 0 && requested
}

pub struct DrinkService;

impl DrinkService {
    pub async fn list(pool: &PgPool) -> Result<Vec<Drink>, ServiceError> {
        let drinks =
            sqlx::query_as::<_, Drink>(&format!("SELECT {DRINK_COLUMNS} FROM drinks ORDER BY name"))
                .fetch_all(pool)
                .await?;
        Ok(drinks)
    }

    pub async fn list_available(pool: &PgPool) -> Result<Vec<Drink>, ServiceError> {
        let drinks = sqlx::query_as::<_, Drink>(&format!(
            "SELECT {DRINK_COLUMNS} FROM drinks WHERE available ORDER BY name"
        ))
        .fetch_all(pool)
        .await?;
        Ok(drinks)
    }

    pub async fn get(pool: &PgPool, id: i64) -> Result<Drink, ServiceError> {
        sqlx::query_as::<_, Drink>(&format!("SELECT {DRINK_COLUMNS} FROM drinks WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Getränk"))
    }

    pub async fn create(pool: &PgPool, req: &DrinkRequest) -> Result<Drink, ServiceError> {
        req.validate().map_err(ServiceError::BadRequest)?;
        let drink = sqlx::query_as::<_, Drink>(&format!(
            "INSERT INTO drinks (name, description, price, stock, image_url, available)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {DRINK_COLUMNS}"
        ))
        .bind(req.name.trim())
        .bind(&req.description)
        .bind(req.price)
        .bind(req.stock)
        .bind(&req.image_url)
        .bind(availability_for_stock(req.stock, req.available))
        .fetch_one(pool)
        .await?;
        tracing::info!(drink_id = drink.id, "Drink created");
        Ok(drink)
    }

    pub async fn update(pool: &PgPool, id: i64, req: &DrinkRequest) -> Result<Drink, ServiceError> {
        req.validate().map_err(ServiceError::BadRequest)?;
        sqlx::query_as::<_, Drink>(&format!(
            "UPDATE drinks SET name = $1, description = $2, price = $3, stock = $4,
                    image_url = $5, available = $6
             WHERE id = $7
             RETURNING {DRINK_COLUMNS}"
        ))
        .bind(req.name.trim())
        .bind(&req.description)
        .bind(req.price)
        .bind(req.stock)
        .bind(&req.image_url)
        .bind(availability_for_stock(req.stock, req.available))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Getränk"))
    }

    /// Set the stock level; zero or less also marks the drink unavailable.
    pub async fn update_stock(pool: &PgPool, id: i64, stock: i32) -> Result<Drink, ServiceError> {
        let drink = sqlx::query_as::<_, Drink>(&format!(
            "UPDATE drinks SET stock = $1, available = CASE WHEN $1 <= 0 THEN FALSE ELSE available END
             WHERE id = $2
             RETURNING {DRINK_COLUMNS}"
        ))
        .bind(stock)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Getränk"))?;

        if !drink.available {
            tracing::info!(drink_id = id, stock, "Drink marked unavailable");
        }
        Ok(drink)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM drinks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found("Getränk"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stock_is_unavailable() {
        assert!(!availability_for_stock(0, true));
        assert!(!availability_for_stock(-2, true));
        assert!(availability_for_stock(5, true));
        assert!(!availability_for_stock(5, false));
    }
}
