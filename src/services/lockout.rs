use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::models::user::User;

/// Consecutive wrong passwords that lock an account.
pub const MAX_FAILED_ATTEMPTS: i32 = 3;
pub const LOCK_DURATION_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Open,
    /// Locked and the lock has run out; the account may be unlocked.
    Expired,
    Locked { until: Option<DateTime<Utc>> },
}

pub fn lock_state(user: &User, now: DateTime<Utc>) -> LockState {
    if user.account_non_locked {
        return LockState::Open;
    }
    match user.lock_time {
        Some(locked_at) => {
            let until = locked_at + Duration::minutes(LOCK_DURATION_MINUTES);
            if until < now {
                LockState::Expired
            } else {
                LockState::Locked { until: Some(until) }
            }
        }
        None => LockState::Locked { until: None },
    }
}

/// New failure count, and whether it reaches the lock threshold.
pub fn next_failure(failed_attempts: i32) -> (i32, bool) {
    let attempts = failed_attempts + 1;
    (attempts, attempts >= MAX_FAILED_ATTEMPTS)
}

pub struct LockoutService;

impl LockoutService {
    /// Returns true when this failure locked the account.
    pub async fn register_failure(pool: &PgPool, user: &User) -> anyhow::Result<bool> {
        let (attempts, lock) = next_failure(user.failed_attempts);
        if lock {
            sqlx::query(
                "UPDATE users SET failed_attempts = $1, account_non_locked = FALSE, lock_time = NOW()
                 WHERE id = $2",
            )
            .bind(attempts)
            .bind(user.id)
            .execute(pool)
            .await?;
            tracing::warn!(user_id = user.id, attempts, "Account locked after failed sign-ins");
        } else {
            sqlx::query("UPDATE users SET failed_attempts = $1 WHERE id = $2")
                .bind(attempts)
                .bind(user.id)
                .execute(pool)
                .await?;
        }
        Ok(lock)
    }

    pub async fn reset(pool: &PgPool, user_id: i64) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET failed_attempts = 0 WHERE id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn unlock(pool: &PgPool, user_id: i64) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET account_non_locked = TRUE, lock_time = NULL, failed_attempts = 0
             WHERE id = $1",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        tracing::info!(user_id, "Account unlocked after lock period");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(non_locked: bool, lock_time: Option<DateTime<Utc>>) -> User {
        User {
            id: 1,
            first_name: "Lea".into(),
            last_name: "Meier".into(),
            email: "lea@mensa.test".into(),
            password_hash: String::new(),
            role: "user".into(),
            failed_attempts: 0,
            account_non_locked: non_locked,
            lock_time,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn third_failure_locks() {
        assert_eq!(next_failure(0), (1, false));
        assert_eq!(next_failure(1), (2, false));
        assert_eq!(next_failure(2), (3, true));
    }

    #[test]
    fn lock_expires_after_ten_minutes() {
        let now = Utc::now();
        let recent = user(false, Some(now - Duration::minutes(3)));
        assert!(matches!(lock_state(&recent, now), LockState::Locked { until: Some(_) }));

        let old = user(false, Some(now - Duration::minutes(11)));
        assert_eq!(lock_state(&old, now), LockState::Expired);

        assert_eq!(lock_state(&user(true, None), now), LockState::Open);
        assert_eq!(lock_state(&user(false, None), now), LockState::Locked { until: None });
    }
}
