use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use crate::{
    errors::ServiceError,
    models::{
        auth::AuthenticatedUser,
        basket::ItemKind,
        order::{
            Order, OrderLine, OrderLineResponse, OrderRequest, OrderResponse, OrderStatus,
            OrderValidationResponse, PaymentStatus, UnavailableProduct,
        },
    },
    services::{
        availability::AvailabilityResolver,
        calendar::CalendarRepository,
        clock::Clock,
        email::EmailService,
        menu::MenuService,
        metrics::{ORDERS_CANCELLED_COUNTER, ORDERS_CREATED_COUNTER},
    },
};

/// Orders for today close this many minutes before the pickup time.
pub const ORDER_CUTOFF_MINUTES: i64 = 30;

pub const MSG_PICKUP_IN_PAST: &str = "Das Abholdatum kann nicht in der Vergangenheit liegen";
pub const MSG_TOO_LATE: &str = "Bestellungen sind nur bis 30 Minuten vor der Abholzeit möglich";
pub const MSG_NO_MENU: &str = "Für das gewählte Datum ist kein Menüplan verfügbar";
pub const MSG_NO_LINES: &str = "Keine gültigen Gerichte in der Bestellung gefunden";
pub const MSG_NOT_CANCELLABLE: &str = "Bestellung kann nicht mehr storniert werden";

const ORDER_COLUMNS: &str = "o.id, o.user_id, o.pickup_date, o.pickup_time, o.order_date, \
     o.total_price, o.status, o.payment_status, o.payment_reference, o.notes";

#[derive(FromRow)]
struct OrderWithUser {
    #[sqlx(flatten)]
    order: Order,
    user_email: String,
    user_name: String,
}

/// Request lines that survived filtering, with quantities summed per item.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PlannedLines {
    pub dishes: BTreeMap<i64, i32>,
    pub drinks: BTreeMap<i64, i32>,
    pub dropped: usize,
}

impl PlannedLines {
    /// Fails when the summed quantity of one item does not fit an `i32`.
    pub fn from_request(req: &OrderRequest) -> Result<Self, String> {
        let mut planned = PlannedLines::default();
        for pos in &req.positions {
            match (pos.dish_id, pos.quantity) {
                (Some(id), Some(qty)) if qty > 0 => add_quantity(&mut planned.dishes, id, qty)?,
                _ => planned.dropped += 1,
            }
        }
        for line in &req.drinks {
            match (line.drink_id, line.quantity) {
                (Some(id), Some(qty)) if qty > 0 => add_quantity(&mut planned.drinks, id, qty)?,
                _ => planned.dropped += 1,
            }
        }
        Ok(planned)
    }

    pub fn is_empty(&self) -> bool {
        self.dishes.is_empty() && self.drinks.is_empty()
    }
}

fn add_quantity(lines: &mut BTreeMap<i64, i32>, id: i64, qty: i32) -> Result<(), String> {
    let total = lines.entry(id).or_default();
    *total = total
        .checked_add(qty)
        .ok_or_else(|| format!("Menge für Artikel {id} ist zu gross"))?;
    Ok(())
}

/// Pickup must not be in the past; same-day pickups need the cut-off margin.
pub fn check_pickup_window(
    pickup_date: NaiveDate,
    pickup_time: NaiveTime,
    now: NaiveDateTime,
) -> Result<(), &'static str> {
    let today = now.date();
    if pickup_date < today {
        return Err(MSG_PICKUP_IN_PAST);
    }
    if pickup_date == today
        && pickup_date.and_time(pickup_time) < now + Duration::minutes(ORDER_CUTOFF_MINUTES)
    {
        return Err(MSG_TOO_LATE);
    }
    Ok(())
}

pub fn order_total(lines: &[(Decimal, i32)]) -> Decimal {
    lines
        .iter()
        .map(|(price, qty)| *price * Decimal::from(*qty))
        .sum()
}

pub struct OrderService;

impl OrderService {
    pub async fn create(
        pool: &PgPool,
        clock: &dyn Clock,
        email: Option<Arc<EmailService>>,
        user_id: i64,
        req: &OrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let now = clock.now();
        check_pickup_window(req.pickup_date, req.pickup_time, now)
            .map_err(|m| ServiceError::BadRequest(m.into()))?;

        let menu_day = MenuService::find_by_date(pool, req.pickup_date)
            .await?
            .ok_or_else(|| ServiceError::BadRequest(MSG_NO_MENU.into()))?;

        let planned = PlannedLines::from_request(req).map_err(ServiceError::BadRequest)?;
        if planned.dropped > 0 {
            tracing::warn!(dropped = planned.dropped, "Invalid order line(s) removed");
        }
        if planned.is_empty() {
            return Err(ServiceError::BadRequest(MSG_NO_LINES.into()));
        }

        let on_menu = Self::menu_dish_ids(pool, menu_day.id).await?;
        if let Some(id) = planned.dishes.keys().find(|id| !on_menu.contains(*id)) {
            return Err(ServiceError::BadRequest(format!(
                "Das Gericht mit ID {id} ist am {} nicht verfügbar",
                req.pickup_date
            )));
        }

        let mut tx = pool.begin().await?;

        let dish_ids: Vec<i64> = planned.dishes.keys().copied().collect();
        let dishes: Vec<(i64, String, Decimal)> =
            sqlx::query_as("SELECT id, name, price FROM dishes WHERE id = ANY($1)")
                .bind(&dish_ids)
                .fetch_all(&mut *tx)
                .await?;

        let drink_ids: Vec<i64> = planned.drinks.keys().copied().collect();
        let drinks: Vec<(i64, String, Decimal, i32, bool)> = sqlx::query_as(
            "SELECT id, name, price, stock, available FROM drinks WHERE id = ANY($1) FOR UPDATE",
        )
        .bind(&drink_ids)
        .fetch_all(&mut *tx)
        .await?;

        // (dish_id, drink_id, name, quantity, unit_price)
        let mut lines: Vec<(Option<i64>, Option<i64>, String, i32, Decimal)> = Vec::new();
        for (&id, &qty) in &planned.dishes {
            let (_, name, price) = dishes
                .iter()
                .find(|(d, _, _)| *d == id)
                .ok_or_else(|| ServiceError::NotFound(format!("Gericht {id} nicht gefunden")))?;
            lines.push((Some(id), None, name.clone(), qty, *price));
        }
        for (&id, &qty) in &planned.drinks {
            let (_, name, price, stock, available) = drinks
                .iter()
                .find(|(d, ..)| *d == id)
                .ok_or_else(|| ServiceError::NotFound(format!("Getränk {id} nicht gefunden")))?;
            if !*available || *stock < qty {
                return Err(ServiceError::BadRequest(format!(
                    "Getränk {name} ist nicht in ausreichender Menge verfügbar"
                )));
            }
            sqlx::query(
                "UPDATE drinks SET stock = stock - $1, available = (stock - $1) > 0 WHERE id = $2",
            )
            .bind(qty)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            lines.push((None, Some(id), name.clone(), qty, *price));
        }

        let priced: Vec<(Decimal, i32)> = lines.iter().map(|l| (l.4, l.3)).collect();
        let total = order_total(&priced);

        let order_id: i64 = sqlx::query_scalar(
            "INSERT INTO orders (user_id, pickup_date, pickup_time, order_date, total_price,
                                 status, payment_status, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(user_id)
        .bind(req.pickup_date)
        .bind(req.pickup_time)
        .bind(now.date())
        .bind(total)
        .bind(OrderStatus::New.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .bind(&req.notes)
        .fetch_one(&mut *tx)
        .await?;

        for (dish_id, drink_id, name, qty, price) in &lines {
            sqlx::query(
                "INSERT INTO order_lines (order_id, dish_id, drink_id, item_name, quantity, unit_price)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(order_id)
            .bind(dish_id)
            .bind(drink_id)
            .bind(name)
            .bind(qty)
            .bind(price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        ORDERS_CREATED_COUNTER.inc();
        tracing::info!(order_id, user_id, %total, "Order created");

        let order = Self::get(pool, order_id).await?;
        if let Some(svc) = email {
            let mail = order.clone();
            tokio::spawn(async move {
                if let Err(e) = svc.send_order_confirmation(&mail).await {
                    tracing::warn!("Failed to send order confirmation: {}", e);
                }
            });
        }
        Ok(order)
    }

    /// Like `create`, but reports unmet conditions together with alternative dates
    /// instead of failing.
    pub async fn create_with_validation(
        pool: &PgPool,
        clock: &dyn Clock,
        email: Option<Arc<EmailService>>,
        user_id: i64,
        req: &OrderRequest,
    ) -> Result<OrderValidationResponse, ServiceError> {
        let now = clock.now();
        let today = now.date();
        if let Err(msg) = check_pickup_window(req.pickup_date, req.pickup_time, now) {
            return Ok(OrderValidationResponse::failed(msg));
        }

        let Some(menu_day) = MenuService::find_by_date(pool, req.pickup_date).await? else {
            let possible_dates = MenuService::future_dates(pool, today).await?;
            return Ok(OrderValidationResponse {
                recommended_date: possible_dates.first().copied(),
                possible_dates,
                ..OrderValidationResponse::failed(MSG_NO_MENU)
            });
        };

        let planned = match PlannedLines::from_request(req) {
            Ok(planned) => planned,
            Err(msg) => return Ok(OrderValidationResponse::failed(msg)),
        };
        if planned.is_empty() {
            return Ok(OrderValidationResponse::failed(MSG_NO_LINES));
        }

        let on_menu = Self::menu_dish_ids(pool, menu_day.id).await?;
        let missing: Vec<i64> = planned
            .dishes
            .keys()
            .copied()
            .filter(|id| !on_menu.contains(id))
            .collect();

        if !missing.is_empty() {
            let calendar = CalendarRepository::load(pool, &missing, &[], today).await?;
            let resolver = AvailabilityResolver::new(&calendar, today);
            let unavailable_products: Vec<UnavailableProduct> = missing
                .iter()
                .filter_map(|&id| {
                    let resolved = resolver.resolve(ItemKind::Dish, id).ok()?;
                    Some(UnavailableProduct {
                        dish_id: id,
                        dish_name: resolved.name,
                        desired_date: req.pickup_date,
                        available_dates: resolved.window,
                    })
                })
                .collect();

            // Dishes that no longer exist are left to `create`, which rejects them.
            if !unavailable_products.is_empty() {
                let possible: BTreeSet<NaiveDate> = unavailable_products
                    .iter()
                    .flat_map(|p| p.available_dates.iter().copied())
                    .collect();
                let possible_dates: Vec<NaiveDate> = possible.into_iter().collect();
                return Ok(OrderValidationResponse {
                    unavailable_products,
                    recommended_date: possible_dates.first().copied(),
                    possible_dates,
                    ..OrderValidationResponse::failed(
                        "Einige Gerichte sind am gewählten Datum nicht verfügbar. Siehe Details unten.",
                    )
                });
            }
        }

        match Self::create(pool, clock, email, user_id, req).await {
            Ok(order) => Ok(OrderValidationResponse {
                success: true,
                message: "Bestellung erfolgreich erstellt".into(),
                order: Some(order),
                ..Default::default()
            }),
            Err(e @ (ServiceError::Database(_) | ServiceError::Internal(_))) => Err(e),
            Err(e) => Ok(OrderValidationResponse::failed(format!(
                "Fehler beim Erstellen der Bestellung: {e}"
            ))),
        }
    }

    pub async fn get(pool: &PgPool, order_id: i64) -> Result<OrderResponse, ServiceError> {
        let row = sqlx::query_as::<_, OrderWithUser>(&format!(
            "SELECT {ORDER_COLUMNS}, u.email AS user_email,
                    u.first_name || ' ' || u.last_name AS user_name
             FROM orders o JOIN users u ON u.id = o.user_id
             WHERE o.id = $1"
        ))
        .bind(order_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Bestellung"))?;

        Self::assemble(pool, vec![row])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("Bestellung"))
    }

    /// Owner, staff or admin.
    pub async fn get_for(
        pool: &PgPool,
        order_id: i64,
        user: &AuthenticatedUser,
    ) -> Result<OrderResponse, ServiceError> {
        let order = Self::get(pool, order_id).await?;
        if order.user_id != user.user_id && !user.is_staff() {
            return Err(ServiceError::Forbidden("Keine Berechtigung für diese Bestellung".into()));
        }
        Ok(order)
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<OrderResponse>, ServiceError> {
        let rows = sqlx::query_as::<_, OrderWithUser>(&format!(
            "SELECT {ORDER_COLUMNS}, u.email AS user_email,
                    u.first_name || ' ' || u.last_name AS user_name
             FROM orders o JOIN users u ON u.id = o.user_id
             ORDER BY o.pickup_date DESC, o.pickup_time DESC"
        ))
        .fetch_all(pool)
        .await?;
        Self::assemble(pool, rows).await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: i64,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let rows = sqlx::query_as::<_, OrderWithUser>(&format!(
            "SELECT {ORDER_COLUMNS}, u.email AS user_email,
                    u.first_name || ' ' || u.last_name AS user_name
             FROM orders o JOIN users u ON u.id = o.user_id
             WHERE o.user_id = $1
             ORDER BY o.pickup_date DESC, o.pickup_time DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Self::assemble(pool, rows).await
    }

    pub async fn list_by_pickup_date(
        pool: &PgPool,
        date: NaiveDate,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let rows = sqlx::query_as::<_, OrderWithUser>(&format!(
            "SELECT {ORDER_COLUMNS}, u.email AS user_email,
                    u.first_name || ' ' || u.last_name AS user_name
             FROM orders o JOIN users u ON u.id = o.user_id
             WHERE o.pickup_date = $1
             ORDER BY o.pickup_time"
        ))
        .bind(date)
        .fetch_all(pool)
        .await?;
        Self::assemble(pool, rows).await
    }

    /// Owner-only cancellation of a new order; returns sold drinks to stock.
    pub async fn cancel(
        pool: &PgPool,
        order_id: i64,
        user_id: i64,
    ) -> Result<OrderResponse, ServiceError> {
        let order = Self::get(pool, order_id).await?;
        if order.user_id != user_id {
            return Err(ServiceError::Forbidden("Keine Berechtigung für diese Bestellung".into()));
        }
        if order.status != OrderStatus::New {
            return Err(ServiceError::BadRequest(MSG_NOT_CANCELLABLE.into()));
        }

        let mut tx = pool.begin().await?;
        // The status guard makes a concurrent second cancel a no-op.
        let updated = sqlx::query(
            "UPDATE orders SET status = $1, payment_status = $2 WHERE id = $3 AND status = $4",
        )
        .bind(OrderStatus::Cancelled.as_str())
        .bind(PaymentStatus::Cancelled.as_str())
        .bind(order_id)
        .bind(OrderStatus::New.as_str())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(ServiceError::BadRequest(MSG_NOT_CANCELLABLE.into()));
        }
        sqlx::query(
            "UPDATE drinks d SET stock = d.stock + ol.quantity, available = TRUE
             FROM order_lines ol
             WHERE ol.order_id = $1 AND ol.drink_id = d.id",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        ORDERS_CANCELLED_COUNTER.inc();
        tracing::info!(order_id, user_id, "Order cancelled");
        Self::get(pool, order_id).await
    }

    pub async fn set_status(
        pool: &PgPool,
        email: Option<Arc<EmailService>>,
        order_id: i64,
        status: OrderStatus,
    ) -> Result<OrderResponse, ServiceError> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(order_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found("Bestellung"));
        }

        let order = Self::get(pool, order_id).await?;
        if let Some(svc) = email {
            let mail = order.clone();
            tokio::spawn(async move {
                if let Err(e) = svc.send_status_update(&mail).await {
                    tracing::warn!("Failed to send status update email: {}", e);
                }
            });
        }
        Ok(order)
    }

    async fn menu_dish_ids(pool: &PgPool, menu_day_id: i64) -> Result<BTreeSet<i64>, sqlx::Error> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT dish_id FROM menu_day_dishes WHERE menu_day_id = $1")
                .bind(menu_day_id)
                .fetch_all(pool)
                .await?;
        Ok(ids.into_iter().collect())
    }

    async fn assemble(
        pool: &PgPool,
        rows: Vec<OrderWithUser>,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let ids: Vec<i64> = rows.iter().map(|r| r.order.id).collect();
        let lines = sqlx::query_as::<_, OrderLine>(
            "SELECT id, order_id, dish_id, drink_id, item_name, quantity, unit_price
             FROM order_lines WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut by_order: HashMap<i64, Vec<OrderLineResponse>> = HashMap::new();
        for line in lines {
            let line_total = line.line_total();
            by_order
                .entry(line.order_id)
                .or_default()
                .push(OrderLineResponse { line, line_total });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let status = row.order.status();
                let payment_status = row.order.payment_status();
                let o = row.order;
                OrderResponse {
                    id: o.id,
                    user_id: o.user_id,
                    user_email: row.user_email,
                    user_name: row.user_name,
                    pickup_date: o.pickup_date,
                    pickup_time: o.pickup_time,
                    order_date: o.order_date,
                    lines: by_order.remove(&o.id).unwrap_or_default(),
                    total_price: o.total_price,
                    status,
                    payment_status,
                    payment_reference: o.payment_reference,
                    notes: o.notes,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{OrderDrinkRequest, OrderPositionRequest};

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_hms_opt(h, m, 0).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn pickup_in_the_past_is_rejected() {
        assert_eq!(check_pickup_window(d(18), t(12, 0), at(d(19), 8, 0)), Err(MSG_PICKUP_IN_PAST));
    }

    #[test]
    fn same_day_orders_close_thirty_minutes_ahead() {
        let now = at(d(19), 11, 40);
        assert_eq!(check_pickup_window(d(19), t(12, 0), now), Err(MSG_TOO_LATE));
        assert!(check_pickup_window(d(19), t(12, 10), now).is_ok());
        assert!(check_pickup_window(d(20), t(7, 0), now).is_ok());
    }

    #[test]
    fn invalid_lines_are_dropped_and_duplicates_summed() {
        let req = OrderRequest {
            pickup_date: d(20),
            pickup_time: t(12, 0),
            positions: vec![
                OrderPositionRequest { dish_id: Some(1), quantity: Some(2) },
                OrderPositionRequest { dish_id: Some(1), quantity: Some(1) },
                OrderPositionRequest { dish_id: None, quantity: Some(1) },
                OrderPositionRequest { dish_id: Some(2), quantity: Some(0) },
            ],
            drinks: vec![
                OrderDrinkRequest { drink_id: Some(9), quantity: Some(1) },
                OrderDrinkRequest { drink_id: Some(8), quantity: None },
            ],
            notes: None,
        };
        let planned = PlannedLines::from_request(&req).unwrap();
        assert_eq!(planned.dishes, BTreeMap::from([(1, 3)]));
        assert_eq!(planned.drinks, BTreeMap::from([(9, 1)]));
        assert_eq!(planned.dropped, 3);
        assert!(!planned.is_empty());
    }

    #[test]
    fn oversized_summed_quantities_are_rejected() {
        let req = OrderRequest {
            pickup_date: d(20),
            pickup_time: t(12, 0),
            positions: vec![
                OrderPositionRequest { dish_id: Some(1), quantity: Some(i32::MAX) },
                OrderPositionRequest { dish_id: Some(1), quantity: Some(2) },
            ],
            drinks: vec![
                OrderDrinkRequest { drink_id: Some(9), quantity: Some(i32::MAX) },
            ],
            notes: None,
        };
        let err = PlannedLines::from_request(&req).unwrap_err();
        assert!(err.contains("Artikel 1"));

        let drinks_only = OrderRequest {
            positions: vec![],
            drinks: vec![
                OrderDrinkRequest { drink_id: Some(9), quantity: Some(i32::MAX) },
                OrderDrinkRequest { drink_id: Some(9), quantity: Some(1) },
            ],
            ..req
        };
        assert!(PlannedLines::from_request(&drinks_only).is_err());
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let total = order_total(&[(Decimal::new(1250, 2), 2), (Decimal::new(380, 2), 1)]);
        assert_eq!(total, Decimal::new(2880, 2));
        assert_eq!(order_total(&[]), Decimal::ZERO);
    }

    #[tokio::test]
    async fn concurrent_cancels_restore_stock_once() {
        let Some(pool) = crate::services::fixtures::pool().await else {
            return;
        };
        let placed = crate::services::fixtures::place_order(&pool, 10, 3).await;
        assert_eq!(crate::services::fixtures::drink_stock(&pool, placed.drink_id).await, 7);

        let (a, b) = tokio::join!(
            OrderService::cancel(&pool, placed.order.id, placed.user_id),
            OrderService::cancel(&pool, placed.order.id, placed.user_id),
        );
        assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
        let err = if a.is_err() { a } else { b };
        assert!(matches!(err, Err(ServiceError::BadRequest(m)) if m == MSG_NOT_CANCELLABLE));
        assert_eq!(crate::services::fixtures::drink_stock(&pool, placed.drink_id).await, 10);

        let order = OrderService::get(&pool, placed.order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }
}
