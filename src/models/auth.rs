use serde::{Deserialize, Serialize};

use super::user::UserRole;

/// Claims embedded in the JWT access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated JWT: available via Axum extractors
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub role: UserRole,
}

impl AuthenticatedUser {
    /// Staff and admins run the kitchen side: menus, stock, order fulfilment.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, UserRole::Staff | UserRole::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
