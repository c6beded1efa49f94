use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

/// Error kinds a service can report to the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    /// Account temporarily locked after repeated failed sign-ins.
    #[error("{0}")]
    Locked(String),

    #[error("Datenbankfehler: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Locked(_) => StatusCode::LOCKED,
            ServiceError::Database(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn not_found(what: &str) -> Self {
        ServiceError::NotFound(format!("{what} nicht gefunden"))
    }
}

/// Turn a service error into the `(status, {"error": ...})` pair handlers return.
pub fn reject(e: ServiceError) -> (StatusCode, Json<Value>) {
    let status = e.status();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("request failed: {e}");
    }
    (status, Json(json!({ "error": e.to_string() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_each_kind_to_its_status() {
        assert_eq!(ServiceError::not_found("Gericht").status(), StatusCode::NOT_FOUND);
        assert_eq!(ServiceError::Locked("x".into()).status(), StatusCode::LOCKED);
        assert_eq!(ServiceError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn reject_carries_the_message() {
        let (status, Json(body)) = reject(ServiceError::BadRequest("Menge fehlt".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Menge fehlt");
    }
}
