use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use bazaar_api::{app_router, GlobalState, SessionClaims};
use bazaar_common::get_current_timestamp;
use bazaar_marketplace::store::{
    MemoryListingStore, MemoryObjectStore, MemoryPaymentGateway, MemoryQuotaStore, MemoryReportStore,
};
use bazaar_marketplace::{PaymentService, QuotaPolicy};

pub const SECRET_SALT: &str = "test_salt";
pub const GATEWAY_SECRET: &str = "test_gateway_secret";
pub const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

pub struct TestApp {
    pub router: Router,
    pub payments: PaymentService,
    pub gateway: Arc<MemoryPaymentGateway>,
}

pub fn build_test_app() -> TestApp {
    let gateway = Arc::new(MemoryPaymentGateway::new("rzp_test_key"));
    let payments = PaymentService::new(gateway.clone(), GATEWAY_SECRET, "INR");

    let state = GlobalState::from_parts(
        Arc::new(MemoryListingStore::default()),
        Arc::new(MemoryQuotaStore::default()),
        Arc::new(MemoryReportStore::default()),
        Arc::new(MemoryObjectStore::default()),
        payments.clone(),
        QuotaPolicy::default(),
        SECRET_SALT.to_string(),
    );

    TestApp {
        router: app_router(state, Duration::from_secs(30)),
        payments,
        gateway,
    }
}

pub fn token_for(user_id: &str) -> String {
    SessionClaims {
        user_id: user_id.to_string(),
        display_name: Some("Test User".to_string()),
        email: Some(format!("{user_id}@example.com")),
        issued_at: get_current_timestamp(),
    }
    .sign(SECRET_SALT)
    .unwrap()
}

pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    app.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn listing_body() -> Value {
    serde_json::json!({
        "title": "Wooden study table",
        "description": "Solid teak, minor scratches on one leg, must pick up.",
        "price": "2500",
        "category": "Home & Garden",
        "phoneNumber": "+91 98765 43210",
        "tags": ["furniture"],
        "locationAddress": "4th Cross, Jayanagar",
        "locationCity": "Bengaluru",
        "images": [PNG],
    })
}
