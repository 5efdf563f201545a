//! Storage and gateway ports used by the marketplace core, plus their
//! MongoDB, R2, Razorpay and in-memory adapters.

use anyhow::Result;
use async_trait::async_trait;

use crate::listing::{Listing, ListingFilter};
use crate::payment::{GatewayOrder, GatewayPayment};
use crate::quota::UserQuota;
use crate::report::ListingReport;

pub mod memory;
pub mod mongo;
pub mod r2;
pub mod razorpay;

pub use memory::{MemoryListingStore, MemoryObjectStore, MemoryPaymentGateway, MemoryQuotaStore, MemoryReportStore};
pub use mongo::{ensure_indexes, MongoListingStore, MongoQuotaStore, MongoReportStore};
pub use r2::R2ObjectStore;
pub use razorpay::RazorpayGateway;

/// An object read back from the image store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Persists the listing and returns it with its assigned id.
    async fn insert(&self, listing: Listing) -> Result<Listing>;

    /// Newest first.
    async fn find_page(&self, filter: &ListingFilter, skip: u64, limit: i64) -> Result<Vec<Listing>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Listing>>;

    async fn delete_by_id(&self, id: &str) -> Result<bool>;

    /// Bumps `report_count` and flips the status to under review once the
    /// count reaches `review_threshold`. `None` when the listing is gone.
    async fn increment_report_count(&self, id: &str, review_threshold: i64) -> Result<Option<Listing>>;
}

#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn get_or_create(&self, user_id: &str) -> Result<UserQuota>;

    /// Atomically increments the free counter if it is below `limit`.
    /// `None` when no slot was left.
    async fn try_consume_free_slot(&self, user_id: &str, limit: i64) -> Result<Option<UserQuota>>;

    async fn record_paid_listing(&self, user_id: &str, amount: i64, paid_at: i64) -> Result<UserQuota>;

    /// Marks a gateway payment as spent. `false` if it was claimed before.
    async fn claim_payment(&self, payment_id: &str, user_id: &str) -> Result<bool>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores the bytes under `name` and returns the object id used for retrieval.
    async fn put(&self, name: &str, data: Vec<u8>, content_type: &str) -> Result<String>;

    async fn get(&self, id: &str) -> Result<Option<StoredObject>>;

    async fn delete(&self, id: &str) -> Result<()>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key handed to the checkout widget.
    fn key_id(&self) -> String;

    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
        auto_capture: bool,
    ) -> Result<GatewayOrder>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert(&self, report: ListingReport) -> Result<ListingReport>;
}
