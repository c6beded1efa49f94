use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;

use crate::{
    errors::ServiceError,
    models::{
        auth::Claims,
        user::{LoginResponse, SignupRequest, User, UserProfile, UserRole},
    },
    services::{
        email::EmailService,
        lockout::{lock_state, LockState, LockoutService, LOCK_DURATION_MINUTES},
        metrics::{LOCKOUTS_COUNTER, LOGINS_COUNTER},
    },
};

pub(crate) const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, role, \
     failed_attempts, account_non_locked, lock_time, created_at";

const BCRYPT_COST: u32 = 12;
const INVALID_CREDENTIALS: &str = "Ungültige E-Mail oder Passwort";

/// Field checks for sign-up, in the order they are reported.
pub fn validate_signup(req: &SignupRequest) -> Result<(), String> {
    let name_ok = |s: &str| (2..=50).contains(&s.trim().chars().count());
    if !name_ok(&req.first_name) {
        return Err("Vorname muss zwischen 2 und 50 Zeichen lang sein".into());
    }
    if !name_ok(&req.last_name) {
        return Err("Nachname muss zwischen 2 und 50 Zeichen lang sein".into());
    }
    if !looks_like_email(&req.email) {
        return Err("Ungültige E-Mail-Adresse".into());
    }
    if !(8..=50).contains(&req.password.chars().count()) {
        return Err("Passwort muss zwischen 8 und 50 Zeichen lang sein".into());
    }
    Ok(())
}

pub fn looks_like_email(email: &str) -> bool {
    match email.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

pub struct AuthService;

impl AuthService {
    pub async fn signup(pool: &PgPool, req: &SignupRequest) -> Result<UserProfile, ServiceError> {
        validate_signup(req).map_err(ServiceError::BadRequest)?;
        let email = req.email.trim().to_lowercase();

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&email)
            .fetch_one(pool)
            .await?;
        if exists {
            return Err(ServiceError::Conflict("E-Mail wird bereits verwendet".into()));
        }

        let hash = bcrypt::hash(&req.password, BCRYPT_COST).map_err(anyhow::Error::from)?;
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (first_name, last_name, email, password_hash, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(req.first_name.trim())
        .bind(req.last_name.trim())
        .bind(&email)
        .bind(hash)
        .bind(UserRole::User.to_string())
        .fetch_one(pool)
        .await?;

        tracing::info!(user_id = user.id, "New user registered");
        Ok(user.into())
    }

    /// Password sign-in with brute-force lockout.
    pub async fn signin(
        pool: &PgPool,
        email_svc: Option<Arc<EmailService>>,
        email: &str,
        password: &str,
        jwt_secret: &str,
        ttl_seconds: u64,
    ) -> Result<LoginResponse, ServiceError> {
        let email = email.trim().to_lowercase();
        let Some(mut user) = Self::find_by_email(pool, &email).await? else {
            LOGINS_COUNTER.with_label_values(&["unknown"]).inc();
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        match lock_state(&user, Utc::now()) {
            LockState::Open => {}
            LockState::Expired => {
                LockoutService::unlock(pool, user.id).await?;
                user.account_non_locked = true;
                user.lock_time = None;
                user.failed_attempts = 0;
            }
            LockState::Locked { .. } => {
                LOGINS_COUNTER.with_label_values(&["locked"]).inc();
                return Err(ServiceError::Locked(format!(
                    "Konto ist gesperrt. Bitte versuchen Sie es in {LOCK_DURATION_MINUTES} Minuten erneut."
                )));
            }
        }

        let valid = bcrypt::verify(password, &user.password_hash).unwrap_or(false);
        if !valid {
            LOGINS_COUNTER.with_label_values(&["failed"]).inc();
            let locked = LockoutService::register_failure(pool, &user).await?;
            if locked {
                LOCKOUTS_COUNTER.inc();
                if let Some(svc) = email_svc {
                    tokio::spawn(async move {
                        if let Err(e) = svc.send_account_locked(&user, LOCK_DURATION_MINUTES).await {
                            tracing::warn!("Failed to send account locked email: {}", e);
                        }
                    });
                }
            }
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        if user.failed_attempts > 0 {
            LockoutService::reset(pool, user.id).await?;
        }

        let role: UserRole = user.role.parse().unwrap_or(UserRole::User);
        let access_token = Self::generate_access_token(user.id, role, jwt_secret, ttl_seconds)?;
        LOGINS_COUNTER.with_label_values(&["success"]).inc();

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".into(),
            user: user.into(),
        })
    }

    pub fn generate_access_token(
        user_id: i64,
        role: UserRole,
        secret: &str,
        ttl_seconds: u64,
    ) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_access_token;

    fn signup(first: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            first_name: first.into(),
            last_name: "Muster".into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn signup_field_rules() {
        assert!(validate_signup(&signup("Anna", "anna@mensa.ch", "geheim123")).is_ok());
        assert!(validate_signup(&signup("A", "anna@mensa.ch", "geheim123")).is_err());
        assert!(validate_signup(&signup("Anna", "anna.mensa.ch", "geheim123")).is_err());
        assert!(validate_signup(&signup("Anna", "anna@mensa.ch", "kurz")).is_err());
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("x@y.ch"));
        assert!(!looks_like_email("@y.ch"));
        assert!(!looks_like_email("x@ch"));
        assert!(!looks_like_email("x y@z.ch"));
    }

    #[test]
    fn issued_token_decodes_to_the_same_user() {
        let token = AuthService::generate_access_token(42, UserRole::Staff, "s3cret", 600).unwrap();
        let user = decode_access_token(&token, "s3cret").unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.role, UserRole::Staff);
        assert!(decode_access_token(&token, "other").is_err());
    }
}
