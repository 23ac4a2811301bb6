use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contracts::dashboards::d500_pharmacy_analytics::ErrorResponse;
use thiserror::Error;

use crate::shared::analytics::error::AnalyticsError;

/// Error returned by the analytics handlers, rendered as `{ "error": ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Analytics(AnalyticsError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Analytics(AnalyticsError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Analytics(AnalyticsError::Cancelled) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Analytics(AnalyticsError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Message sent to the client. Store details stay in the log.
    fn public_message(&self) -> String {
        match self {
            ApiError::InvalidBody(rejection) => {
                format!("invalid request body: {}", rejection.body_text())
            }
            ApiError::Analytics(AnalyticsError::Store(_)) => "analytics query failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Analytics request failed ({}): {}", status.as_u16(), self);
        } else {
            tracing::warn!("Analytics request rejected ({}): {}", status.as_u16(), self);
        }

        let body = ErrorResponse {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
