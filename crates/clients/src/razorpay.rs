use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use bazaar_common::{define_module_client, optional_env_var, required_env_var, ModuleClient};

const DEFAULT_API_URL: &str = "https://api.razorpay.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct RazorpayConnection {
    pub http: Client,
    pub key_id: String,
    pub key_secret: String,
    pub api_url: String,
}

impl RazorpayConnection {
    pub fn new(key_id: String, key_secret: String, api_url: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| anyhow!("Failed to build Razorpay http client: {}", e))?;

        Ok(Self { http, key_id, key_secret, api_url })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(
            required_env_var("RAZORPAY_KEY_ID")?,
            required_env_var("RAZORPAY_KEY_SECRET")?,
            optional_env_var("RAZORPAY_API_URL", DEFAULT_API_URL),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Minor currency units (paise for INR).
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    /// `1` asks the gateway to capture the payment as soon as it is authorized.
    pub payment_capture: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayPayment {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorBody {
    error: RazorpayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

define_module_client! {
    (struct RazorpayClient, "razorpay")
    client_type: RazorpayConnection,
    env: ["RAZORPAY_KEY_ID", "RAZORPAY_KEY_SECRET"],
    setup: async { RazorpayConnection::from_env() }
}

impl RazorpayClient {
    pub fn key_id(&self) -> &str {
        &self.get_client().key_id
    }

    pub fn key_secret(&self) -> &str {
        &self.get_client().key_secret
    }

    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<RazorpayOrder> {
        let conn = self.get_client();
        let response = conn.http
            .post(format!("{}/orders", conn.api_url))
            .basic_auth(&conn.key_id, Some(&conn.key_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send Razorpay order request: {}", e))?;

        Self::parse_response(response, "create order").await
    }

    pub async fn fetch_payment(&self, payment_id: &str) -> Result<RazorpayPayment> {
        let conn = self.get_client();
        let response = conn.http
            .get(format!("{}/payments/{}", conn.api_url, payment_id))
            .basic_auth(&conn.key_id, Some(&conn.key_secret))
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send Razorpay payment request: {}", e))?;

        Self::parse_response(response, "fetch payment").await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            let detail = serde_json::from_str::<RazorpayErrorBody>(&text)
                .map(|body| format!("{}: {}", body.error.code, body.error.description))
                .unwrap_or(text);
            return Err(anyhow!("Razorpay {} failed with status {}: {}", operation, status, detail));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| anyhow!("Failed to decode Razorpay {} response: {}", operation, e))
    }
}
