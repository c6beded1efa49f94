use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

/// Fixed-window limit: at most `max_attempts` per `window_secs` for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_attempts: u64,
    pub window_secs: u64,
}

/// Sign-in attempts per email address.
pub const SIGNIN_LIMIT: RateLimit = RateLimit {
    max_attempts: 10,
    window_secs: 15 * 60,
};

/// Account creations per email address.
pub const SIGNUP_LIMIT: RateLimit = RateLimit {
    max_attempts: 5,
    window_secs: 60 * 60,
};

impl RateLimit {
    pub fn exceeded(&self, count: u64) -> bool {
        count > self.max_attempts
    }
}

/// Redis key for `scope` and a case-insensitive identity such as an email.
pub fn rate_key(scope: &str, identity: &str) -> String {
    format!("rate:{scope}:{}", identity.trim().to_lowercase())
}

/// INCR the counter for `key`, starting the window on the first hit.
/// Redis failures let the request through.
pub async fn check_rate_limit(
    redis: &mut redis::aio::MultiplexedConnection,
    key: &str,
    limit: RateLimit,
) -> Result<(), (StatusCode, Json<Value>)> {
    let count: u64 = match redis::cmd("INCR").arg(key).query_async(redis).await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!(key, "Rate limit check skipped: {}", e);
            return Ok(());
        }
    };

    if count == 1 {
        let _: Result<(), _> = redis::cmd("EXPIRE")
            .arg(key)
            .arg(limit.window_secs)
            .query_async(redis)
            .await;
    }

    if !limit.exceeded(count) {
        return Ok(());
    }

    let ttl: i64 = redis::cmd("TTL")
        .arg(key)
        .query_async(redis)
        .await
        .unwrap_or(limit.window_secs as i64);
    tracing::warn!(key, count, "Rate limit exceeded");
    Err((
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "Zu viele Versuche. Bitte versuchen Sie es in einigen Minuten erneut.",
            "retry_after": ttl.max(0),
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_ignore_case_and_whitespace() {
        assert_eq!(rate_key("signin", " Lea@Mensa.ch "), "rate:signin:lea@mensa.ch");
    }

    #[test]
    fn limit_allows_exactly_max_attempts() {
        assert!(!SIGNIN_LIMIT.exceeded(10));
        assert!(SIGNIN_LIMIT.exceeded(11));
        assert!(SIGNUP_LIMIT.exceeded(6));
    }
}
