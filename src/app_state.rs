use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::Config,
    services::{clock::Clock, email::EmailService},
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: redis::aio::MultiplexedConnection,
    pub config: Arc<Config>,
    pub email: Option<Arc<EmailService>>,
    pub clock: Arc<dyn Clock>,
}
