use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Events service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum EventsServiceError {
    #[error("limit must be between 1 and 200")]
    InvalidLimit,
    #[error("payload must be a JSON object")]
    InvalidPayload,
    #[error("event type must not contain line breaks")]
    InvalidEventType,
    #[error("no tenants configured")]
    NoTenantsConfigured,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl EventsServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidLimit => "INVALID_LIMIT",
            Self::InvalidPayload => "INVALID_PAYLOAD",
            Self::InvalidEventType => "INVALID_EVENT_TYPE",
            Self::NoTenantsConfigured => "NO_TENANTS_CONFIGURED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Message including the full cause chain, for logs.
    pub fn report(&self) -> String {
        match self {
            Self::Internal(e) => format!("{e:#}"),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for EventsServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidLimit | Self::InvalidPayload | Self::InvalidEventType => {
                StatusCode::BAD_REQUEST
            }
            Self::NoTenantsConfigured | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %format!("{e:#}"), kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
