use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use bazaar_marketplace::MarketError;

use crate::response::AppError;
use crate::GlobalState;

const CACHE_CONTROL: &str = "public, max-age=31536000";

pub fn image_routes() -> Router<GlobalState> {
    Router::new()
        .route("/api/images/{id}",
            get(serve_image)
        )
}

async fn serve_image(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let image = state.listings
        .images()
        .fetch(&id)
        .await?
        .ok_or_else(|| MarketError::NotFound("Image".to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CACHE_CONTROL, CACHE_CONTROL.to_string()),
        ],
        image.data,
    )
        .into_response())
}
