//! In-process adapters for tests and local runs. Each one can be told to
//! fail specific calls so rollback paths can be exercised.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use bazaar_common::get_current_timestamp;
use bazaar_database::bson::oid::ObjectId;

use super::{ListingStore, ObjectStore, PaymentGateway, QuotaStore, ReportStore, StoredObject};
use crate::listing::{Listing, ListingFilter, ListingStatus};
use crate::payment::{GatewayOrder, GatewayPayment};
use crate::quota::UserQuota;
use crate::report::ListingReport;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn new_id() -> String {
    ObjectId::new().to_hex()
}

#[derive(Default)]
pub struct MemoryListingStore {
    listings: Mutex<Vec<Listing>>,
    fail_inserts: Mutex<bool>,
}

impl MemoryListingStore {
    pub fn len(&self) -> usize {
        lock(&self.listings).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fail_inserts(&self, fail: bool) {
        *lock(&self.fail_inserts) = fail;
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn insert(&self, mut listing: Listing) -> Result<Listing> {
        if *lock(&self.fail_inserts) {
            return Err(anyhow!("listing store unavailable"));
        }
        listing.id = new_id();
        lock(&self.listings).push(listing.clone());
        Ok(listing)
    }

    async fn find_page(&self, filter: &ListingFilter, skip: u64, limit: i64) -> Result<Vec<Listing>> {
        // Same bound as the document store, which encodes skip as a signed 64-bit value.
        if skip > i64::MAX as u64 {
            return Err(anyhow!("skip {} does not fit a signed 64-bit offset", skip));
        }

        let mut matching: Vec<Listing> = lock(&self.listings)
            .iter()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        Ok(matching
            .into_iter()
            .skip(skip as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Listing>> {
        Ok(lock(&self.listings).iter().find(|l| l.id == id).cloned())
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let mut listings = lock(&self.listings);
        let before = listings.len();
        listings.retain(|l| l.id != id);
        Ok(listings.len() < before)
    }

    async fn increment_report_count(&self, id: &str, review_threshold: i64) -> Result<Option<Listing>> {
        let mut listings = lock(&self.listings);
        Ok(listings.iter_mut().find(|l| l.id == id).map(|listing| {
            listing.report_count += 1;
            if listing.report_count >= review_threshold {
                listing.status = ListingStatus::UnderReview;
            }
            listing.clone()
        }))
    }
}

#[derive(Default)]
pub struct MemoryQuotaStore {
    quotas: Mutex<HashMap<String, UserQuota>>,
    claimed_payments: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn get_or_create(&self, user_id: &str) -> Result<UserQuota> {
        let mut quotas = lock(&self.quotas);
        Ok(quotas
            .entry(user_id.to_string())
            .or_insert_with(|| UserQuota::new(user_id, get_current_timestamp()))
            .clone())
    }

    async fn try_consume_free_slot(&self, user_id: &str, limit: i64) -> Result<Option<UserQuota>> {
        let mut quotas = lock(&self.quotas);
        let quota = quotas
            .entry(user_id.to_string())
            .or_insert_with(|| UserQuota::new(user_id, get_current_timestamp()));

        if quota.free_listings_count >= limit {
            return Ok(None);
        }
        quota.free_listings_count += 1;
        quota.updated_at = get_current_timestamp();
        Ok(Some(quota.clone()))
    }

    async fn record_paid_listing(&self, user_id: &str, amount: i64, paid_at: i64) -> Result<UserQuota> {
        let mut quotas = lock(&self.quotas);
        let quota = quotas
            .entry(user_id.to_string())
            .or_insert_with(|| UserQuota::new(user_id, paid_at));

        quota.paid_listings_count += 1;
        quota.total_paid_amount += amount;
        quota.last_payment_date = Some(paid_at);
        quota.updated_at = paid_at;
        Ok(quota.clone())
    }

    async fn claim_payment(&self, payment_id: &str, user_id: &str) -> Result<bool> {
        let mut claimed = lock(&self.claimed_payments);
        if claimed.contains_key(payment_id) {
            return Ok(false);
        }
        claimed.insert(payment_id.to_string(), user_id.to_string());
        Ok(true)
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    put_attempts: AtomicUsize,
    fail_put_number: Mutex<Option<usize>>,
    failing_deletes: Mutex<HashSet<String>>,
}

impl MemoryObjectStore {
    /// Makes the `n`th upload attempt (1-based, counted over the store's lifetime) fail.
    pub fn fail_upload_number(&self, n: usize) {
        *lock(&self.fail_put_number) = Some(n);
    }

    pub fn fail_delete_of(&self, id: &str) {
        lock(&self.failing_deletes).insert(id.to_string());
    }

    pub fn put_attempts(&self) -> usize {
        self.put_attempts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        lock(&self.objects).contains_key(id)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, name: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        let attempt = self.put_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if *lock(&self.fail_put_number) == Some(attempt) {
            return Err(anyhow!("upload {} rejected by object store", attempt));
        }

        lock(&self.objects).insert(
            name.to_string(),
            StoredObject { data, content_type: content_type.to_string() },
        );
        Ok(name.to_string())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredObject>> {
        Ok(lock(&self.objects).get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if lock(&self.failing_deletes).contains(id) {
            return Err(anyhow!("delete of {} rejected by object store", id));
        }
        lock(&self.objects).remove(id);
        Ok(())
    }
}

pub struct MemoryPaymentGateway {
    key_id: String,
    orders: Mutex<Vec<GatewayOrder>>,
    payments: Mutex<HashMap<String, GatewayPayment>>,
    fetches: AtomicUsize,
}

impl MemoryPaymentGateway {
    pub fn new(key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            orders: Mutex::new(Vec::new()),
            payments: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Registers a payment the gateway will report. `amount` is in minor units.
    pub fn add_payment(&self, order_id: &str, payment_id: &str, amount: i64, status: &str) {
        lock(&self.payments).insert(
            payment_id.to_string(),
            GatewayPayment {
                id: payment_id.to_string(),
                amount,
                currency: "INR".to_string(),
                status: status.to_string(),
                order_id: Some(order_id.to_string()),
                method: Some("upi".to_string()),
                created_at: get_current_timestamp(),
            },
        );
    }

    pub fn set_status(&self, payment_id: &str, status: &str) {
        if let Some(payment) = lock(&self.payments).get_mut(payment_id) {
            payment.status = status.to_string();
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn orders(&self) -> Vec<GatewayOrder> {
        lock(&self.orders).clone()
    }
}

#[async_trait]
impl PaymentGateway for MemoryPaymentGateway {
    fn key_id(&self) -> String {
        self.key_id.clone()
    }

    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
        _auto_capture: bool,
    ) -> Result<GatewayOrder> {
        let mut orders = lock(&self.orders);
        let order = GatewayOrder {
            id: format!("order_{}", orders.len() + 1),
            amount: amount_minor,
            currency: currency.to_string(),
            receipt: Some(receipt.to_string()),
            status: "created".to_string(),
        };
        orders.push(order.clone());
        Ok(order)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        lock(&self.payments)
            .get(payment_id)
            .cloned()
            .ok_or_else(|| anyhow!("payment {} does not exist", payment_id))
    }
}

#[derive(Default)]
pub struct MemoryReportStore {
    reports: Mutex<Vec<ListingReport>>,
}

impl MemoryReportStore {
    pub fn reports(&self) -> Vec<ListingReport> {
        lock(&self.reports).clone()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn insert(&self, mut report: ListingReport) -> Result<ListingReport> {
        report.id = new_id();
        lock(&self.reports).push(report.clone());
        Ok(report)
    }
}
