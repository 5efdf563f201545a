use std::sync::Arc;

use serde::{Deserialize, Serialize};

use bazaar_common::{get_current_timestamp_millis, hmac_sha256_hex, verify_hmac_sha256_hex};

use crate::error::MarketError;
use crate::store::PaymentGateway;

/// Gateway status of a payment whose funds have settled.
pub const CAPTURED_STATUS: &str = "captured";

/// The three values the checkout widget hands back after a payment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentVerificationRequest {
    #[serde(alias = "razorpay_order_id")]
    pub order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub payment_id: String,
    #[serde(alias = "razorpay_signature")]
    pub signature: String,
}

impl PaymentVerificationRequest {
    fn is_complete(&self) -> bool {
        !self.order_id.trim().is_empty()
            && !self.payment_id.trim().is_empty()
            && !self.signature.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub order_id: Option<String>,
    pub method: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub order_id: String,
    /// Minor units, as the checkout widget expects.
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
    pub key_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub id: String,
    /// Major units.
    pub amount: f64,
    pub status: String,
    pub order_id: Option<String>,
    pub method: Option<String>,
    pub created_at: i64,
}

#[derive(Clone)]
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    key_secret: String,
    currency: String,
}

impl PaymentService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, key_secret: impl Into<String>, currency: impl Into<String>) -> Self {
        Self { gateway, key_secret: key_secret.into(), currency: currency.into() }
    }

    /// Signature the gateway produces for `order_id|payment_id`.
    pub fn expected_signature(&self, order_id: &str, payment_id: &str) -> String {
        hmac_sha256_hex(&self.key_secret, &format!("{}|{}", order_id, payment_id))
    }

    /// Opens a gateway order for `amount` major units with auto capture.
    pub async fn create_order(&self, amount: f64) -> Result<PaymentOrder, MarketError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(MarketError::InvalidPayment("Invalid payment amount".to_string()));
        }

        let amount_minor = (amount * 100.0).round() as i64;
        let receipt = format!("receipt_{}", get_current_timestamp_millis());

        let order = self.gateway
            .create_order(amount_minor, &self.currency, &receipt, true)
            .await
            .map_err(|e| {
                tracing::error!("[PaymentService::create_order] Order creation failed: {:?}", e);
                MarketError::Dependency(e.context("Failed to create order"))
            })?;

        tracing::info!("[PaymentService::create_order] Created order {} for {} {}", order.id, order.amount, order.currency);

        Ok(PaymentOrder {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
            receipt: order.receipt,
            status: order.status,
            key_id: self.gateway.key_id(),
        })
    }

    /// Checks the signature locally, then asks the gateway whether the
    /// payment was captured. A valid signature alone is not enough.
    pub async fn verify(&self, request: &PaymentVerificationRequest) -> Result<PaymentConfirmation, MarketError> {
        if !request.is_complete() {
            return Err(MarketError::InvalidPayment("Missing payment information".to_string()));
        }

        let signed = format!("{}|{}", request.order_id, request.payment_id);
        if !verify_hmac_sha256_hex(&self.key_secret, &signed, request.signature.trim()) {
            tracing::warn!("[PaymentService::verify] Signature mismatch for order {}", request.order_id);
            return Err(MarketError::InvalidPayment("Invalid payment signature".to_string()));
        }

        let payment = self.gateway
            .fetch_payment(&request.payment_id)
            .await
            .map_err(|e| {
                tracing::error!("[PaymentService::verify] Failed to fetch payment {}: {:?}", request.payment_id, e);
                MarketError::Dependency(e.context("Payment verification failed"))
            })?;

        if payment.status != CAPTURED_STATUS {
            tracing::warn!(
                "[PaymentService::verify] Payment {} has status {}",
                payment.id,
                payment.status
            );
            return Err(MarketError::PaymentNotCaptured);
        }

        if let Some(order_id) = payment.order_id.as_deref() {
            if order_id != request.order_id {
                return Err(MarketError::InvalidPayment("Payment does not belong to this order".to_string()));
            }
        }

        tracing::info!("[PaymentService::verify] Payment {} verified", payment.id);

        Ok(PaymentConfirmation {
            id: payment.id,
            amount: payment.amount as f64 / 100.0,
            status: payment.status,
            order_id: payment.order_id,
            method: payment.method,
            created_at: payment.created_at,
        })
    }
}
