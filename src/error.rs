use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::{auth::AuthError, response::ApiResponse, store::StoreError};

/// Non-standard status used for a missing or expired password reset token.
pub const RESET_TOKEN_INVALID: u16 = 498;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("reset token missing or expired")]
    ResetTokenInvalid,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn not_allowed() -> Self {
        Self::Forbidden("Not allowed".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ResetTokenInvalid => {
                StatusCode::from_u16(RESET_TOKEN_INVALID).unwrap_or(StatusCode::BAD_REQUEST)
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(e) => {
                error!(error = ?e, "internal error");
                "Server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ApiResponse::message(message))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(field) => Self::Conflict(format!("{field} already in use")),
            StoreError::Database(e) => Self::Internal(e.into()),
            StoreError::Other(e) => Self::Internal(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Forbidden => Self::not_allowed(),
            AuthError::Internal(e) => Self::Internal(e),
            other => Self::Unauthenticated(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        warn!(error = %e, "rejected request body");
        Self::Validation("Wrong input".into())
    }
}

impl From<PathRejection> for AppError {
    fn from(e: PathRejection) -> Self {
        warn!(error = %e, "rejected path parameter");
        Self::NotFound("Not found".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::not_allowed().status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::ResetTokenInvalid.status().as_u16(), 498);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn auth_errors_become_unauthenticated_except_forbidden() {
        assert_eq!(AppError::from(AuthError::NoToken).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::from(AuthError::InvalidToken).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::from(AuthError::UserNotFound).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::from(AuthError::Forbidden).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn duplicate_becomes_conflict() {
        let err = AppError::from(StoreError::Duplicate("slug"));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "slug already in use");
    }
}
