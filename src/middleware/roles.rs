use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use crate::models::auth::AuthenticatedUser;

/// Staff or admin; kitchen-side operations.
pub fn require_staff(user: &AuthenticatedUser) -> Result<(), (StatusCode, Json<Value>)> {
    if user.is_staff() {
        Ok(())
    } else {
        Err(forbidden())
    }
}

pub fn require_admin(user: &AuthenticatedUser) -> Result<(), (StatusCode, Json<Value>)> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(forbidden())
    }
}

fn forbidden() -> (StatusCode, Json<Value>) {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "Zugriff verweigert" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    fn user(role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser { user_id: 1, role }
    }

    #[test]
    fn staff_checks_accept_admins() {
        assert!(require_staff(&user(UserRole::Staff)).is_ok());
        assert!(require_staff(&user(UserRole::Admin)).is_ok());
        assert!(require_staff(&user(UserRole::User)).is_err());
    }

    #[test]
    fn admin_checks_reject_staff() {
        assert!(require_admin(&user(UserRole::Admin)).is_ok());
        let (status, _) = require_admin(&user(UserRole::Staff)).unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
