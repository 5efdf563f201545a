use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::metrics;
use crate::response::AppError;
use crate::GlobalState;

pub fn misc_routes() -> Router<GlobalState> {
    Router::new()
        .route("/health",
            get(|| async { "OK" })
        )
        .route("/metrics",
            get(export_metrics)
        )
}

async fn export_metrics() -> Result<impl IntoResponse, AppError> {
    let body = metrics::render()
        .map_err(|e| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
