use axum::extract::{DefaultBodyLimit, Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde::Deserialize;
use serde_json::json;

use bazaar_marketplace::{CreateListingInput, ListingCategory, ListingFilter, MarketError, ReportRequest};

use crate::metrics::{IMAGES_UPLOADED, LISTINGS_CREATED, LISTING_CREATION_REJECTED};
use crate::middleware::{authenticate, SessionClaims};
use crate::response::{AppError, AppSuccess};
use crate::GlobalState;

/// Five base64 images at the size cap plus the rest of the form.
const MAX_CREATE_BODY_BYTES: usize = 40 * 1024 * 1024;

pub fn listing_routes(state: GlobalState) -> Router<GlobalState> {
    Router::new()
        .route("/listings",
            post(create_listing)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
            .layer(DefaultBodyLimit::max(MAX_CREATE_BODY_BYTES))
            .get(list_listings)
        )
        .route("/listings/{id}",
            get(get_listing)
            .merge(
                axum::routing::delete(delete_listing)
                .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
            )
        )
        .route("/listings/{id}/report",
            post(report_listing)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/quota",
            get(quota_status)
            .route_layer(middleware::from_fn_with_state(state, authenticate))
        )
}

async fn create_listing(
    State(state): State<GlobalState>,
    Extension(claims): Extension<SessionClaims>,
    Json(input): Json<CreateListingInput>,
) -> Result<AppSuccess, AppError> {
    let image_count = input.images.len() as u64;

    match state.listings.create(&claims.owner(), input).await {
        Ok(listing) => {
            let kind = if listing.is_paid { "paid" } else { "free" };
            LISTINGS_CREATED.with_label_values(&[kind]).inc();
            IMAGES_UPLOADED.inc_by(image_count);

            Ok(AppSuccess::new(StatusCode::CREATED, "Listing created successfully", json!(listing)))
        }
        Err(e) => {
            LISTING_CREATION_REJECTED.with_label_values(&[e.reason()]).inc();
            Err(e.into())
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    category: Option<String>,
    city: Option<String>,
    #[serde(alias = "user_id")]
    user_id: Option<String>,
    page: Option<u64>,
    #[serde(alias = "page_size")]
    page_size: Option<u64>,
}

impl ListQuery {
    fn filter(&self) -> Result<ListingFilter, AppError> {
        let category = self.category
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(str::parse::<ListingCategory>)
            .transpose()?;

        Ok(ListingFilter {
            category,
            city: self.city.clone().filter(|c| !c.is_empty()),
            user_id: self.user_id.clone().filter(|u| !u.is_empty()),
        })
    }
}

async fn list_listings(
    State(state): State<GlobalState>,
    Query(query): Query<ListQuery>,
) -> Result<AppSuccess, AppError> {
    let page = state.listings
        .list(&query.filter()?, query.page, query.page_size)
        .await?;

    Ok(AppSuccess::new(StatusCode::OK, "Listings fetched", json!(page)))
}

async fn get_listing(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let listing = state.listings
        .get_by_id(&id)
        .await?
        .ok_or_else(|| MarketError::NotFound("Listing".to_string()))?;

    Ok(AppSuccess::new(StatusCode::OK, "Listing fetched", json!(listing)))
}

async fn delete_listing(
    State(state): State<GlobalState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    state.listings.delete_owned(&id, &claims.user_id).await?;
    Ok(AppSuccess::new(StatusCode::OK, "Listing deleted successfully", json!({ "id": id })))
}

async fn report_listing(
    State(state): State<GlobalState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
    Json(request): Json<ReportRequest>,
) -> Result<AppSuccess, AppError> {
    let report = state.listings.report(&id, &claims.owner(), request).await?;
    Ok(AppSuccess::new(StatusCode::CREATED, "Report submitted", json!(report)))
}

async fn quota_status(
    State(state): State<GlobalState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<AppSuccess, AppError> {
    let status = state.listings.quota().status(&claims.user_id).await?;
    Ok(AppSuccess::new(StatusCode::OK, "Quota fetched", json!(status)))
}
