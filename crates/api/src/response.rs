use std::sync::OnceLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use bazaar_marketplace::MarketError;

pub type AppSuccess = GenericResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericResponse {
    pub success: bool,
    pub status: u16,
    pub message: String,
    pub data: serde_json::Value,
}

impl GenericResponse {
    pub fn new(status: StatusCode, message: &str, data: serde_json::Value) -> Self {
        Self {
            success: status.is_success(),
            status: status.as_u16(),
            message: message.to_string(),
            data,
        }
    }
}

impl IntoResponse for GenericResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

// Make our own error that wraps `anyhow::Error`.
#[derive(Debug)]
pub struct AppError(pub StatusCode, pub anyhow::Error);
impl AppError {
    pub fn new(status: StatusCode, err: anyhow::Error) -> Self {
        Self(status, err)
    }

    pub fn market(&self) -> Option<&MarketError> {
        self.1.downcast_ref::<MarketError>()
    }

    fn data(&self) -> serde_json::Value {
        match self.market() {
            Some(MarketError::Validation(errors)) => json!({ "errors": errors }),
            Some(MarketError::QuotaExceeded { fee }) => json!({ "requiresPayment": true, "fee": fee }),
            _ => json!({}),
        }
    }
}

/// Set once at startup. Unset means server errors stay opaque.
static EXPOSE_INTERNAL_ERRORS: OnceLock<bool> = OnceLock::new();

pub fn expose_internal_errors(expose: bool) {
    if EXPOSE_INTERNAL_ERRORS.set(expose).is_err() {
        tracing::warn!("error detail level already configured");
    }
}

fn public_message(status: StatusCode, err: &anyhow::Error, expose_internal: bool) -> String {
    if !status.is_server_error() {
        err.to_string()
    } else if expose_internal {
        format!("{:#}", err)
    } else {
        "Internal server error".to_string()
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.0.is_server_error() {
            tracing::error!("CODE: {}, ERROR: {:?}", self.0.as_u16(), self.1);
        } else {
            tracing::warn!("CODE: {}, MESSAGE: {}", self.0.as_u16(), self.1);
        }

        let expose = EXPOSE_INTERNAL_ERRORS.get().copied().unwrap_or(false);
        let message = public_message(self.0, &self.1, expose);
        GenericResponse::new(self.0, &message, self.data()).into_response()
    }
}

// Marketplace errors pick their own status; anything else is a bad request.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        let status = err
            .downcast_ref::<MarketError>()
            .and_then(|e| StatusCode::from_u16(e.status_code()).ok())
            .unwrap_or(StatusCode::BAD_REQUEST);
        Self(status, err)
    }
}
