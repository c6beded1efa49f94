use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_int_counter, CounterVec,
    Gauge, GaugeVec, IntCounter,
};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::models::order::OrderStatus;

lazy_static! {
    // ── Event counters ──────────────────────────────────────────────────────
    pub static ref BASKET_VALIDATIONS_COUNTER: CounterVec = register_counter_vec!(
        "mensa_basket_validations_total",
        "Warenkorbprüfungen nach Ergebnis",
        &["outcome"]
    ).unwrap();

    pub static ref ORDERS_CREATED_COUNTER: IntCounter = register_int_counter!(
        "mensa_orders_created_total",
        "Angelegte Bestellungen"
    ).unwrap();

    pub static ref ORDERS_CANCELLED_COUNTER: IntCounter = register_int_counter!(
        "mensa_orders_cancelled_total",
        "Stornierte Bestellungen"
    ).unwrap();

    pub static ref PAYMENTS_COUNTER: CounterVec = register_counter_vec!(
        "mensa_payments_total",
        "Zahlungsversuche nach Methode und Ergebnis",
        &["method", "outcome"]
    ).unwrap();

    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "mensa_logins_total",
        "Anmeldeversuche nach Status",
        &["status"]
    ).unwrap();

    pub static ref LOCKOUTS_COUNTER: IntCounter = register_int_counter!(
        "mensa_account_lockouts_total",
        "Gesperrte Konten nach zu vielen Fehlversuchen"
    ).unwrap();

    // ── Business metrics ────────────────────────────────────────────────────
    pub static ref ORDERS_TODAY_GAUGE: GaugeVec = register_gauge_vec!(
        "mensa_orders_today",
        "Bestellungen mit heutigem Abholdatum nach Status",
        &["status"]
    ).unwrap();

    pub static ref FUTURE_MENU_DAYS_GAUGE: Gauge = register_gauge!(
        "mensa_future_menu_days",
        "Geplante Menütage ab heute"
    ).unwrap();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        if let Err(e) = collect(&pool).await {
            warn!("Metrics: initial collection failed: {}", e);
        }
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
        }
    });
}

async fn collect(pool: &PgPool) -> anyhow::Result<()> {
    let counts: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*)::BIGINT FROM orders
         WHERE pickup_date = CURRENT_DATE GROUP BY status",
    )
    .fetch_all(pool)
    .await?;

    // Statuses with no orders today would otherwise keep yesterday's value.
    for status in OrderStatus::ALL {
        let n = counts
            .iter()
            .find(|(s, _)| s == status.as_str())
            .map_or(0, |(_, n)| *n);
        ORDERS_TODAY_GAUGE
            .with_label_values(&[status.as_str()])
            .set(n as f64);
    }

    let menu_days: i64 =
        sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM menu_days WHERE date >= CURRENT_DATE")
            .fetch_one(pool)
            .await?;
    FUTURE_MENU_DAYS_GAUGE.set(menu_days as f64);

    info!("Metrics: collected ({} future menu day(s))", menu_days);
    Ok(())
}
