use sqlx::PgPool;

use crate::{
    errors::ServiceError,
    models::user::{UpdateProfileRequest, User, UserProfile, UserRole},
    services::auth::{looks_like_email, USER_COLUMNS},
};

pub struct UserService;

impl UserService {
    pub async fn get(pool: &PgPool, user_id: i64) -> Result<User, ServiceError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Benutzer"))
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<UserProfile>, ServiceError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY last_name, first_name"
        ))
        .fetch_all(pool)
        .await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    pub async fn update_profile(
        pool: &PgPool,
        user_id: i64,
        req: &UpdateProfileRequest,
    ) -> Result<UserProfile, ServiceError> {
        let email = req.email.trim().to_lowercase();
        if !looks_like_email(&email) {
            return Err(ServiceError::BadRequest("Ungültige E-Mail-Adresse".into()));
        }
        if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
            return Err(ServiceError::BadRequest("Vor- und Nachname sind erforderlich".into()));
        }

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id != $2)",
        )
        .bind(&email)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(ServiceError::Conflict("E-Mail wird bereits verwendet".into()));
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET first_name = $1, last_name = $2, email = $3
             WHERE id = $4
             RETURNING {USER_COLUMNS}"
        ))
        .bind(req.first_name.trim())
        .bind(req.last_name.trim())
        .bind(&email)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Benutzer"))?;

        Ok(user.into())
    }

    /// Change the caller's password after checking the current one.
    pub async fn change_password(
        pool: &PgPool,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        if !(8..=50).contains(&new_password.chars().count()) {
            return Err(ServiceError::BadRequest(
                "Passwort muss zwischen 8 und 50 Zeichen lang sein".into(),
            ));
        }

        let user = Self::get(pool, user_id).await?;
        if !bcrypt::verify(current_password, &user.password_hash).unwrap_or(false) {
            return Err(ServiceError::BadRequest("Aktuelles Passwort ist falsch".into()));
        }

        let new_hash = bcrypt::hash(new_password, 12).map_err(anyhow::Error::from)?;
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(new_hash)
            .bind(user_id)
            .execute(pool)
            .await?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    pub async fn set_role(
        pool: &PgPool,
        user_id: i64,
        role: UserRole,
    ) -> Result<UserProfile, ServiceError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(role.to_string())
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Benutzer"))?;

        tracing::info!(user_id, %role, "Role updated");
        Ok(user.into())
    }
}
