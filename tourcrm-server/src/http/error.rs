//! API error types with IntoResponse
//!
//! Errors are converted to `{"error": <kind>, "message": <text>}` JSON
//! responses with a matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::repos::DbError;
use crate::models::ValidationError;
use crate::services::ServiceError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Request clashes with stored state (409)
    Conflict(String),

    /// Bitrix24 answered with an error or was unreachable (502)
    Upstream(String),

    /// Bitrix24 integration switched off (503)
    NotConfigured,

    /// Database error (500, logged)
    Database(DbError),
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            Self::NotConfigured => (StatusCode::SERVICE_UNAVAILABLE, "not_configured"),
            Self::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = match self {
            Self::Validation(e) => e.to_string(),
            Self::NotFound { resource, id } => format!("{} '{}' not found", resource, id),
            Self::Conflict(message) => message,
            Self::Upstream(message) => {
                tracing::warn!("Bitrix24 error: {}", message);
                message
            }
            Self::NotConfigured => "Bitrix24 integration is not configured".to_owned(),
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!("Database error: {}", e);
                "an internal error occurred".to_owned()
            }
        };

        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Conflict(message) => Self::Conflict(message),
            DbError::Sqlx(_) => Self::Database(e),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(e) => Self::Validation(e),
            ServiceError::Db(e) => e.into(),
            ServiceError::Conflict(message) => Self::Conflict(message),
            ServiceError::Upstream(e) => Self::Upstream(e.to_string()),
            ServiceError::NotConfigured => Self::NotConfigured,
        }
    }
}

impl From<tourcrm_bitrix::BitrixError> for ApiError {
    fn from(e: tourcrm_bitrix::BitrixError) -> Self {
        Self::Upstream(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn validation_error_is_400() {
        let err = ApiError::Validation(ValidationError::Empty { field: "first_name" });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["message"], "first_name cannot be empty");
    }

    #[tokio::test]
    async fn not_found_is_404() {
        let err: ApiError = DbError::not_found("lead", "42").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn service_errors_map_to_status() {
        let conflict: ApiError = ServiceError::Conflict("tour is fully booked".into()).into();
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let upstream: ApiError = tourcrm_bitrix::BitrixError::unexpected("crm.deal.add", "boom").into();
        assert_eq!(upstream.into_response().status(), StatusCode::BAD_GATEWAY);

        let off: ApiError = ServiceError::NotConfigured.into();
        assert_eq!(off.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn database_details_are_hidden() {
        let err = ApiError::Database(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "an internal error occurred");
    }
}
