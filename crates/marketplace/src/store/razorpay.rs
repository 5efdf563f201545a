use anyhow::Result;
use async_trait::async_trait;

use bazaar_clients::{CreateOrderRequest, RazorpayClient, RazorpayOrder, RazorpayPayment};

use super::PaymentGateway;
use crate::payment::{GatewayOrder, GatewayPayment};

#[derive(Clone)]
pub struct RazorpayGateway {
    client: RazorpayClient,
}

impl RazorpayGateway {
    pub fn new(client: RazorpayClient) -> Self {
        Self { client }
    }

    pub fn key_secret(&self) -> &str {
        self.client.key_secret()
    }
}

impl From<RazorpayOrder> for GatewayOrder {
    fn from(order: RazorpayOrder) -> Self {
        Self {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
            receipt: order.receipt,
            status: order.status,
        }
    }
}

impl From<RazorpayPayment> for GatewayPayment {
    fn from(payment: RazorpayPayment) -> Self {
        Self {
            id: payment.id,
            amount: payment.amount,
            currency: payment.currency,
            status: payment.status,
            order_id: payment.order_id,
            method: payment.method,
            created_at: payment.created_at,
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> String {
        self.client.key_id().to_string()
    }

    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
        auto_capture: bool,
    ) -> Result<GatewayOrder> {
        let request = CreateOrderRequest {
            amount: amount_minor,
            currency: currency.to_string(),
            receipt: receipt.to_string(),
            payment_capture: u8::from(auto_capture),
        };
        Ok(self.client.create_order(&request).await?.into())
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        Ok(self.client.fetch_payment(payment_id).await?.into())
    }
}
