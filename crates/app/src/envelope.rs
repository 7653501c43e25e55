use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use ee_gateway_core::types::ErrorEnvelope;

/// Error response in the `{success: false, ...}` envelope the frontend
/// consumes. Distinguishes the three failure kinds the gateway can hit:
/// missing initialization, a parameter the caller got wrong, and an
/// upstream call that failed.
pub struct ApiError {
    status: StatusCode,
    body: ErrorEnvelope,
}

impl ApiError {
    /// Fixed error returned while the engine is unavailable. Handlers must
    /// emit this without touching the network.
    pub fn not_initialized() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorEnvelope::new("Earth Engine not initialized"),
        }
    }

    pub fn invalid_parameter(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorEnvelope::new(detail),
        }
    }

    pub fn upstream(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorEnvelope::new(detail),
        }
    }

    pub fn upstream_with_fallback(
        detail: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorEnvelope::new(detail).with_fallback(suggestion),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = Json(self.body).into_response();
        *response.status_mut() = self.status;
        response
    }
}
