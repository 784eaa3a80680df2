use serde_json::json;
use std::fmt::Display;

use anyhow::Error as anyhowError;
use async_graphql::ErrorExtensions;
use axum::{http::StatusCode, response::IntoResponse};
use validator::ValidationErrors;

#[derive(Debug)]
pub enum AppError {
    // bad or oversized input, duplicate unique field
    Validation(anyhowError),
    // missing, invalid or expired token
    Unauthenticated(anyhowError),
    // username/password mismatch on login
    InvalidCredentials(anyhowError),
    // referenced id does not resolve
    NotFound(anyhowError),
    InternalServerError(anyhowError),
    ServiceUnavailable(anyhowError),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::InvalidCredentials(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) | AppError::InvalidCredentials(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to hand to clients. Internal causes stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InternalServerError(_) => "internal error".to_string(),
            AppError::ServiceUnavailable(_) => "service unavailable".to_string(),
            other => other.to_string(),
        }
    }

    fn log(&self) {
        match self {
            AppError::InternalServerError(e) | AppError::ServiceUnavailable(e) => {
                tracing::error!(code = self.code(), error = ?e, "request failed");
            }
            _ => tracing::debug!(code = self.code(), error = %self, "request rejected"),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(e)
            | AppError::Unauthenticated(e)
            | AppError::InvalidCredentials(e)
            | AppError::NotFound(e)
            | AppError::InternalServerError(e)
            | AppError::ServiceUnavailable(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Validation(e)
            | AppError::Unauthenticated(e)
            | AppError::InvalidCredentials(e)
            | AppError::NotFound(e)
            | AppError::InternalServerError(e)
            | AppError::ServiceUnavailable(e) => e.source(),
        }
    }
}

impl From<anyhowError> for AppError {
    fn from(e: anyhowError) -> Self {
        AppError::InternalServerError(e)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound(anyhow::anyhow!("record not found")),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                AppError::ServiceUnavailable(e.into())
            }
            other => AppError::InternalServerError(other.into()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(e: ValidationErrors) -> Self {
        let mut fields: Vec<_> = e.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut error_messages = String::new();
        for (field, errors) in fields {
            for error in errors {
                error_messages.push_str(&format!(
                    "{}: {} ",
                    field,
                    error
                        .message
                        .as_ref()
                        .map_or("invalid value", |m| m.as_ref())
                ));
            }
        }
        AppError::Validation(anyhow::anyhow!(error_messages.trim().to_string()))
    }
}

impl ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        self.log();
        let code = self.code();
        async_graphql::Error::new(self.public_message()).extend_with(|_, e| e.set("code", code))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();
        let status = self.status();

        #[cfg(debug_assertions)]
        let error_response = json!({
            "error": {
                "message": self.public_message(),
                "code": self.code(),
            }
        });

        #[cfg(not(debug_assertions))]
        let error_response = json!({
            "error": {
                "message": status.canonical_reason().unwrap_or("An error occurred"),
            }
        });
        (status, axum::Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
