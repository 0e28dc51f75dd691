use actix_web::{HttpResponse, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Failure taxonomy surfaced to API callers. Every variant maps to exactly
/// one HTTP status; database failures are logged and kept opaque.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "Invalid credentials")]
    InvalidCredentials,

    #[display(fmt = "Invalid token")]
    TokenInvalid,

    #[display(fmt = "Token expired")]
    TokenExpired,

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    /// Caller's role requires a linked employee record that is absent.
    #[display(fmt = "{}", _0)]
    PolicyViolation(String),

    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),

    #[display(fmt = "{}", _0)]
    Validation(String),

    /// Unique-key violation (MySQL sqlstate 23000).
    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "Internal server error")]
    Database(sqlx::Error),

    #[display(fmt = "Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn forbidden(msg: &str) -> Self {
        ApiError::Forbidden(msg.to_string())
    }

    pub fn validation(msg: &str) -> Self {
        ApiError::Validation(msg.to_string())
    }

    /// Map a sqlx error on an INSERT/UPDATE into either a duplicate-key
    /// conflict with a caller-facing message or an opaque database error.
    pub fn on_conflict(err: sqlx::Error, msg: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23000") {
                return ApiError::Conflict(msg.to_string());
            }
        }
        ApiError::from(err)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "Database error");
        ApiError::Database(err)
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials | ApiError::TokenInvalid | ApiError::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden(_) | ApiError::PolicyViolation(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::forbidden("no").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::PolicyViolation("no employee record".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::NotFound("Employee").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::validation("bad dates").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("duplicate".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn not_found_names_the_resource() {
        assert_eq!(ApiError::NotFound("Leave request").to_string(), "Leave request not found");
    }
}
