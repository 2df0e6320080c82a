//! Unified error handling for the HTTP surface.
//!
//! Service errors map into [`AppError`] variants; user-correctable input
//! problems keep their detail, everything else is opaque to the client and
//! logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, CatalogError, CheckoutError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// State conflict (duplicate account, repeated return request).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Internal(_)) {
            tracing::error!(error = %self, "Request error");
        }

        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound("resource not found".to_owned()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other @ (RepositoryError::Database(_) | RepositoryError::DataCorruption(_)) => {
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidEmail(_)
            | AuthError::WeakPassword(_)
            | AuthError::InvalidOtp
            | AuthError::OtpExpired => Self::BadRequest(e.to_string()),
            AuthError::InvalidCredentials | AuthError::InvalidToken => {
                Self::Unauthorized(e.to_string())
            }
            AuthError::NotVerified | AuthError::WrongRole => Self::Forbidden(e.to_string()),
            AuthError::UserAlreadyExists => Self::Conflict(e.to_string()),
            AuthError::Repository(inner) => inner.into(),
            AuthError::PasswordHash => Self::Internal(e.to_string()),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::EmptyCart
            | CheckoutError::InvalidQuantity(_)
            | CheckoutError::VariantNotFound(_)
            | CheckoutError::InsufficientStock { .. }
            | CheckoutError::AddressNotFound => Self::BadRequest(e.to_string()),
            CheckoutError::TotalOverflow => Self::Internal(e.to_string()),
            CheckoutError::Repository(inner) => inner.into(),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::ProductNotFound => Self::NotFound(e.to_string()),
            CatalogError::DuplicateVariantKey { .. } => Self::BadRequest(e.to_string()),
            CatalogError::KeyCollision(_) => Self::Internal(e.to_string()),
            CatalogError::Repository(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use trendmart_core::VariantId;

    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn status_codes_match_error_classes() {
        assert_eq!(
            status_of(AppError::NotFound("order".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Unauthorized("no token".to_owned())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Forbidden("customers only".to_owned())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::Conflict("duplicate".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Internal("boom".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn insufficient_stock_is_a_detailed_bad_request() {
        let err: AppError = CheckoutError::InsufficientStock {
            variant_id: VariantId::new(7),
            available: 1,
            requested: 3,
        }
        .into();

        assert!(matches!(&err, AppError::BadRequest(msg)
            if msg.contains('7') && msg.contains('1') && msg.contains('3')));
    }

    #[test]
    fn database_errors_stay_opaque() {
        let err: AppError = RepositoryError::DataCorruption("order 1 bad".to_owned()).into();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn key_collisions_surface_as_internal() {
        let err: AppError = CatalogError::KeyCollision("variant key collision".to_owned()).into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
