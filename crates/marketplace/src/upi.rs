use std::collections::HashSet;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use bazaar_common::get_current_timestamp_millis;

use crate::error::MarketError;
use crate::validation::ValidationErrors;

const AMOUNT_TOLERANCE: f64 = 0.01;

static ICICI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Rs\.([\d,.]+) paid to .+?Ref:(\d+)").expect("valid regex"));
static HDFC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Rs\.([\d,.]+) sent to .+?Ref:(\d+)").expect("valid regex"));
static SBI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)PAID Rs\.([\d,.]+).+?UPI-(\d+)").expect("valid regex"));

/// A bank's debit-notification format. Capture 1 is the amount, capture 2 the UPI reference.
struct SmsParser {
    bank: &'static str,
    pattern: &'static Lazy<Regex>,
}

static PARSERS: [SmsParser; 3] = [
    SmsParser { bank: "ICICI", pattern: &ICICI_PATTERN },
    SmsParser { bank: "HDFC", pattern: &HDFC_PATTERN },
    SmsParser { bank: "SBI", pattern: &SBI_PATTERN },
];

#[derive(Debug, Clone, PartialEq)]
struct ParsedSms {
    bank: &'static str,
    amount: f64,
    transaction_id: String,
}

impl SmsParser {
    fn parse(&self, sms: &str) -> Option<ParsedSms> {
        let captures = self.pattern.captures(sms)?;
        let amount = captures.get(1)?.as_str().replace(',', "").parse::<f64>().ok()?;
        let transaction_id = captures.get(2)?.as_str().to_string();
        Some(ParsedSms { bank: self.bank, amount, transaction_id })
    }
}

/// First parser that matches wins.
fn parse_sms(sms: &str) -> Option<ParsedSms> {
    PARSERS.iter().find_map(|parser| parser.parse(sms))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpiVerificationRequest {
    pub transaction_id: String,
    pub amount: f64,
    pub sms_content: String,
    pub timestamp: Option<String>,
}

impl UpiVerificationRequest {
    fn validate(&self) -> Result<(), MarketError> {
        let mut errors = ValidationErrors::default();
        let len = self.transaction_id.chars().count();
        if !(8..=50).contains(&len) {
            errors.add("transactionId", "Transaction id must be between 8 and 50 characters");
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            errors.add("amount", "Amount must be a positive number");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(MarketError::Validation(errors))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpiVerification {
    pub verification_id: String,
    pub transaction_id: String,
    pub amount: f64,
    pub bank: String,
}

/// Verifies manually reported UPI transfers against the bank's SMS text.
/// Used transaction ids are remembered for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct UpiVerifier {
    used: Mutex<HashSet<String>>,
}

impl UpiVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verify(&self, request: &UpiVerificationRequest) -> Result<UpiVerification, MarketError> {
        request.validate()?;

        let parsed = parse_sms(&request.sms_content).ok_or_else(|| {
            MarketError::InvalidPayment("Could not verify transaction from SMS content".to_string())
        })?;

        if parsed.transaction_id != request.transaction_id
            || (parsed.amount - request.amount).abs() >= AMOUNT_TOLERANCE
        {
            return Err(MarketError::InvalidPayment("Transaction details do not match".to_string()));
        }

        let mut used = self.used.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !used.insert(request.transaction_id.clone()) {
            tracing::warn!("[UpiVerifier::verify] Transaction {} replayed", request.transaction_id);
            return Err(MarketError::PaymentAlreadyUsed(request.transaction_id.clone()));
        }
        drop(used);

        tracing::info!(
            "[UpiVerifier::verify] Verified {} UPI transaction {} for {}",
            parsed.bank,
            parsed.transaction_id,
            parsed.amount
        );

        Ok(UpiVerification {
            verification_id: format!("VER-{}-{}", get_current_timestamp_millis(), request.transaction_id),
            transaction_id: parsed.transaction_id,
            amount: parsed.amount,
            bank: parsed.bank.to_string(),
        })
    }
}
