pub mod auth;
pub mod basket;
pub mod dish;
pub mod drink;
pub mod menu;
pub mod order;
pub mod payment;
pub mod user;
