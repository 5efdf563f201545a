use std::sync::Arc;

use serde::{Deserialize, Serialize};

use bazaar_common::get_current_timestamp;

use crate::error::MarketError;
use crate::payment::{PaymentService, PaymentVerificationRequest};
use crate::store::QuotaStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaPolicy {
    pub free_listings_limit: i64,
    /// Major currency units.
    pub listing_fee: i64,
    pub currency: String,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            free_listings_limit: 2,
            listing_fee: 5,
            currency: "INR".to_string(),
        }
    }
}

/// Per-user listing counters. Counters only ever grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuota {
    pub user_id: String,
    pub free_listings_count: i64,
    pub paid_listings_count: i64,
    pub total_paid_amount: i64,
    pub last_payment_date: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl UserQuota {
    pub fn new(user_id: impl Into<String>, now: i64) -> Self {
        Self {
            user_id: user_id.into(),
            free_listings_count: 0,
            paid_listings_count: 0,
            total_paid_amount: 0,
            last_payment_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub free_used: i64,
    pub free_total: i64,
    pub free_remaining: i64,
    pub paid_count: i64,
    pub total_paid_amount: i64,
    pub needs_payment: bool,
    pub fee: i64,
    pub currency: String,
}

impl QuotaStatus {
    fn from_quota(quota: &UserQuota, policy: &QuotaPolicy) -> Self {
        let free_remaining = (policy.free_listings_limit - quota.free_listings_count).max(0);
        Self {
            free_used: quota.free_listings_count,
            free_total: policy.free_listings_limit,
            free_remaining,
            paid_count: quota.paid_listings_count,
            total_paid_amount: quota.total_paid_amount,
            needs_payment: free_remaining == 0,
            fee: policy.listing_fee,
            currency: policy.currency.clone(),
        }
    }
}

/// What a successful quota check consumed.
#[derive(Debug, Clone, PartialEq)]
pub enum ListingCharge {
    Free,
    Paid { payment_id: String },
}

impl ListingCharge {
    pub fn is_paid(&self) -> bool {
        matches!(self, ListingCharge::Paid { .. })
    }

    pub fn payment_id(&self) -> Option<&str> {
        match self {
            ListingCharge::Paid { payment_id } => Some(payment_id),
            ListingCharge::Free => None,
        }
    }
}

/// Decides whether a user may publish another listing and records what it cost.
#[derive(Clone)]
pub struct QuotaLedger {
    store: Arc<dyn QuotaStore>,
    payments: PaymentService,
    policy: QuotaPolicy,
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn QuotaStore>, payments: PaymentService, policy: QuotaPolicy) -> Self {
        Self { store, payments, policy }
    }

    pub async fn status(&self, user_id: &str) -> Result<QuotaStatus, MarketError> {
        let quota = self.store.get_or_create(user_id).await?;
        Ok(QuotaStatus::from_quota(&quota, &self.policy))
    }

    /// Cheap early rejection for unpaid requests, before any image is uploaded.
    /// Not authoritative: [`QuotaLedger::consume`] re-checks atomically.
    pub async fn precheck(&self, user_id: &str) -> Result<(), MarketError> {
        let status = self.status(user_id).await?;
        if status.needs_payment {
            return Err(MarketError::QuotaExceeded { fee: self.policy.listing_fee });
        }
        Ok(())
    }

    /// Takes a free slot, or when `payment` is given, verifies it with the
    /// gateway, claims it so it cannot unlock a second listing and records
    /// the fee.
    pub async fn consume(
        &self,
        user_id: &str,
        payment: Option<&PaymentVerificationRequest>,
    ) -> Result<ListingCharge, MarketError> {
        let Some(request) = payment else {
            return match self.store.try_consume_free_slot(user_id, self.policy.free_listings_limit).await? {
                Some(quota) => {
                    tracing::info!(
                        "[QuotaLedger::consume] User {} used free listing {}/{}",
                        user_id,
                        quota.free_listings_count,
                        self.policy.free_listings_limit
                    );
                    Ok(ListingCharge::Free)
                }
                None => Err(MarketError::QuotaExceeded { fee: self.policy.listing_fee }),
            };
        };

        let confirmation = self.payments.verify(request).await?;
        if confirmation.amount < self.policy.listing_fee as f64 {
            return Err(MarketError::InvalidPayment(format!(
                "Payment of {} does not cover the listing fee of {}",
                confirmation.amount, self.policy.listing_fee
            )));
        }

        if !self.store.claim_payment(&confirmation.id, user_id).await? {
            tracing::warn!("[QuotaLedger::consume] Payment {} replayed by user {}", confirmation.id, user_id);
            return Err(MarketError::PaymentAlreadyUsed(confirmation.id));
        }

        let quota = self.store
            .record_paid_listing(user_id, self.policy.listing_fee, get_current_timestamp())
            .await?;

        tracing::info!(
            "[QuotaLedger::consume] User {} paid for listing with {} ({} paid listings)",
            user_id,
            confirmation.id,
            quota.paid_listings_count
        );

        Ok(ListingCharge::Paid { payment_id: confirmation.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::CAPTURED_STATUS;
    use crate::store::{MemoryPaymentGateway, MemoryQuotaStore};

    const SECRET: &str = "quota_secret";

    fn ledger() -> (QuotaLedger, Arc<MemoryQuotaStore>, Arc<MemoryPaymentGateway>) {
        let store = Arc::new(MemoryQuotaStore::default());
        let gateway = Arc::new(MemoryPaymentGateway::new("rzp_test_key"));
        let payments = PaymentService::new(gateway.clone(), SECRET, "INR");
        (QuotaLedger::new(store.clone(), payments, QuotaPolicy::default()), store, gateway)
    }

    fn paid_request(ledger: &QuotaLedger, order_id: &str, payment_id: &str) -> PaymentVerificationRequest {
        PaymentVerificationRequest {
            order_id: order_id.to_string(),
            payment_id: payment_id.to_string(),
            signature: ledger.payments.expected_signature(order_id, payment_id),
        }
    }

    #[tokio::test]
    async fn fresh_user_status() {
        let (ledger, _, _) = ledger();
        let status = ledger.status("u1").await.unwrap();
        assert_eq!(status.free_remaining, 2);
        assert!(!status.needs_payment);
        assert_eq!(status.fee, 5);
    }

    #[tokio::test]
    async fn free_slots_run_out() {
        let (ledger, _, _) = ledger();
        assert_eq!(ledger.consume("u1", None).await.unwrap(), ListingCharge::Free);
        assert_eq!(ledger.consume("u1", None).await.unwrap(), ListingCharge::Free);
        assert!(matches!(
            ledger.consume("u1", None).await,
            Err(MarketError::QuotaExceeded { fee: 5 })
        ));
        assert!(matches!(ledger.precheck("u1").await, Err(MarketError::QuotaExceeded { .. })));
        assert!(ledger.precheck("u2").await.is_ok());
    }

    #[tokio::test]
    async fn payment_cannot_be_reused() {
        let (ledger, store, gateway) = ledger();
        gateway.add_payment("order_1", "pay_1", 500, CAPTURED_STATUS);
        let request = paid_request(&ledger, "order_1", "pay_1");

        let charge = ledger.consume("u1", Some(&request)).await.unwrap();
        assert_eq!(charge.payment_id(), Some("pay_1"));

        assert!(matches!(
            ledger.consume("u2", Some(&request)).await,
            Err(MarketError::PaymentAlreadyUsed(id)) if id == "pay_1"
        ));

        let quota = store.get_or_create("u1").await.unwrap();
        assert_eq!(quota.paid_listings_count, 1);
        assert_eq!(quota.total_paid_amount, 5);
        assert!(quota.last_payment_date.is_some());
        assert_eq!(store.get_or_create("u2").await.unwrap().paid_listings_count, 0);
    }

    #[tokio::test]
    async fn underpayment_is_rejected() {
        let (ledger, store, gateway) = ledger();
        gateway.add_payment("order_1", "pay_1", 100, CAPTURED_STATUS);
        let request = paid_request(&ledger, "order_1", "pay_1");

        assert!(matches!(ledger.consume("u1", Some(&request)).await, Err(MarketError::InvalidPayment(_))));
        assert_eq!(store.get_or_create("u1").await.unwrap().paid_listings_count, 0);
    }
}
