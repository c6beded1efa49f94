pub mod auth;
pub mod basket;
pub mod dishes;
pub mod drinks;
pub mod health;
pub mod menu;
pub mod menu_days;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod users;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::AppState;

/// Every API route; layers and state are attached by the caller.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        // Auth
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/signin", post(auth::signin))
        // Users
        .route("/api/users/me", get(users::me).put(users::update_me))
        .route("/api/users/me/password", put(users::change_password))
        .route("/api/users", get(users::list_users))
        .route("/api/users/{id}", get(users::get_user))
        .route("/api/users/{id}/role", put(users::set_role))
        // Dishes
        .route("/api/dishes", get(dishes::list_dishes).post(dishes::create_dish))
        .route("/api/dishes/on/{date}", get(dishes::dishes_on))
        .route(
            "/api/dishes/{id}",
            get(dishes::get_dish).put(dishes::update_dish).delete(dishes::delete_dish),
        )
        .route("/api/dishes/{id}/available-dates", get(dishes::available_dates))
        .route("/api/dishes/{id}/with-alternatives", get(dishes::with_alternatives))
        // Drinks
        .route("/api/drinks", get(drinks::list_drinks).post(drinks::create_drink))
        .route("/api/drinks/available", get(drinks::list_available))
        .route(
            "/api/drinks/{id}",
            get(drinks::get_drink).put(drinks::update_drink).delete(drinks::delete_drink),
        )
        .route("/api/drinks/{id}/stock", put(drinks::update_stock))
        // Menu plans
        .route(
            "/api/menu-days",
            get(menu_days::list_menu_days).post(menu_days::create_menu_day),
        )
        .route("/api/menu-days/future", get(menu_days::list_future))
        .route("/api/menu-days/date/{date}", get(menu_days::get_by_date))
        .route(
            "/api/menu-days/{id}",
            get(menu_days::get_menu_day)
                .put(menu_days::update_menu_day)
                .delete(menu_days::delete_menu_day),
        )
        .route("/api/menu/today", get(menu::today))
        .route("/api/menu/date/{date}", get(menu::on_date))
        .route("/api/menu/week", get(menu::week))
        // Basket
        .route("/api/basket/validate", post(basket::validate_basket))
        // Orders
        .route("/api/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/orders/mine", get(orders::my_orders))
        .route("/api/orders/validate", post(orders::create_with_validation))
        .route("/api/orders/date/{date}", get(orders::orders_on))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/cancel", put(orders::cancel_order))
        .route("/api/orders/{id}/status", put(orders::update_status))
        // Payments
        .route("/api/payments/webhook", post(payments::webhook))
        .route(
            "/api/payments/{order_id}",
            get(payments::get_payment).post(payments::process_payment),
        )
}
