pub mod auth;
pub mod availability;
pub mod basket;
pub mod calendar;
pub mod clock;
pub mod dishes;
pub mod drinks;
pub mod email;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod lockout;
pub mod menu;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod users;
