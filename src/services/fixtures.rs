//! Database fixtures for service tests that need a live Postgres.
//! Tests using them return early when `TEST_DATABASE_URL` is unset.

use chrono::{Duration, NaiveDate, NaiveTime};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db,
    models::order::{OrderDrinkRequest, OrderPositionRequest, OrderRequest, OrderResponse},
    services::{clock::FixedClock, orders::OrderService},
};

pub async fn pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = db::create_pool(&url, 5).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    Some(pool)
}

/// One user with a pending order for a dish and `drink_qty` units of a drink.
pub struct PlacedOrder {
    pub user_id: i64,
    pub drink_id: i64,
    pub order: OrderResponse,
}

pub async fn place_order(pool: &PgPool, drink_stock: i32, drink_qty: i32) -> PlacedOrder {
    let tag = Uuid::new_v4();
    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (first_name, last_name, email, password_hash)
         VALUES ('Test', 'Kunde', $1, 'x') RETURNING id",
    )
    .bind(format!("{tag}@mensa.test"))
    .fetch_one(pool)
    .await
    .unwrap();

    let dish_id: i64 =
        sqlx::query_scalar("INSERT INTO dishes (name, price) VALUES ($1, 8.50) RETURNING id")
            .bind(format!("Gericht {tag}"))
            .fetch_one(pool)
            .await
            .unwrap();
    let drink_id: i64 = sqlx::query_scalar(
        "INSERT INTO drinks (name, price, stock) VALUES ($1, 2.00, $2) RETURNING id",
    )
    .bind(format!("Getränk {tag}"))
    .bind(drink_stock)
    .fetch_one(pool)
    .await
    .unwrap();

    // Far-future day so parallel tests rarely share a menu.
    let base = NaiveDate::from_ymd_opt(2400, 1, 1).unwrap();
    let day = base + Duration::days((tag.as_u128() % 36_500) as i64);
    let menu_day_id: i64 = sqlx::query_scalar(
        "INSERT INTO menu_days (date) VALUES ($1)
         ON CONFLICT (date) DO UPDATE SET date = EXCLUDED.date RETURNING id",
    )
    .bind(day)
    .fetch_one(pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO menu_day_dishes (menu_day_id, dish_id) VALUES ($1, $2)")
        .bind(menu_day_id)
        .bind(dish_id)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO menu_day_drinks (menu_day_id, drink_id) VALUES ($1, $2)")
        .bind(menu_day_id)
        .bind(drink_id)
        .execute(pool)
        .await
        .unwrap();

    let req = OrderRequest {
        pickup_date: day,
        pickup_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        positions: vec![OrderPositionRequest { dish_id: Some(dish_id), quantity: Some(1) }],
        drinks: vec![OrderDrinkRequest { drink_id: Some(drink_id), quantity: Some(drink_qty) }],
        notes: None,
    };
    let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
    let order = OrderService::create(pool, &clock, None, user_id, &req).await.unwrap();
    PlacedOrder { user_id, drink_id, order }
}

pub async fn drink_stock(pool: &PgPool, drink_id: i64) -> i32 {
    sqlx::query_scalar("SELECT stock FROM drinks WHERE id = $1")
        .bind(drink_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
