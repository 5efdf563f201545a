use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{middleware, Router};
use serde::Deserialize;
use serde_json::json;

use bazaar_marketplace::{PaymentVerificationRequest, UpiVerificationRequest};

use crate::metrics::PAYMENT_VERIFICATIONS;
use crate::middleware::authenticate;
use crate::response::{AppError, AppSuccess};
use crate::GlobalState;

pub fn payment_routes(state: GlobalState) -> Router<GlobalState> {
    Router::new()
        .route("/api/razorpay",
            post(create_order)
            .put(verify_payment)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/verify-upi",
            post(verify_upi)
            .route_layer(middleware::from_fn_with_state(state, authenticate))
        )
}

#[derive(Debug, Deserialize)]
struct CreateOrderBody {
    amount: f64,
}

async fn create_order(
    State(state): State<GlobalState>,
    Json(body): Json<CreateOrderBody>,
) -> Result<AppSuccess, AppError> {
    let order = state.payments.create_order(body.amount).await?;
    Ok(AppSuccess::new(StatusCode::OK, "Order created", json!({ "order": order })))
}

async fn verify_payment(
    State(state): State<GlobalState>,
    Json(request): Json<PaymentVerificationRequest>,
) -> Result<AppSuccess, AppError> {
    tracing::info!("[/api/razorpay] Verifying payment {} for order {}", request.payment_id, request.order_id);

    match state.payments.verify(&request).await {
        Ok(payment) => {
            PAYMENT_VERIFICATIONS.with_label_values(&["razorpay", "verified"]).inc();
            Ok(AppSuccess::new(StatusCode::OK, "Payment verified successfully", json!({ "payment": payment })))
        }
        Err(e) => {
            PAYMENT_VERIFICATIONS.with_label_values(&["razorpay", e.reason()]).inc();
            Err(e.into())
        }
    }
}

async fn verify_upi(
    State(state): State<GlobalState>,
    Json(request): Json<UpiVerificationRequest>,
) -> Result<AppSuccess, AppError> {
    match state.upi.verify(&request) {
        Ok(verification) => {
            PAYMENT_VERIFICATIONS.with_label_values(&["upi", "verified"]).inc();
            Ok(AppSuccess::new(StatusCode::OK, "Transaction verified successfully", json!(verification)))
        }
        Err(e) => {
            PAYMENT_VERIFICATIONS.with_label_values(&["upi", e.reason()]).inc();
            Err(e.into())
        }
    }
}
