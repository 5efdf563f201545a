use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use bazaar_common::get_current_timestamp;
use bazaar_database::bson::{doc, oid::ObjectId, Bson, Document};
use bazaar_database::mongodb::Database;
use bazaar_database::{is_duplicate_key_error, MongoDbObject};

use super::{ListingStore, QuotaStore, ReportStore};
use crate::listing::{Listing, ListingCategory, ListingFilter, ListingLocation, ListingStatus};
use crate::quota::UserQuota;
use crate::report::{ListingReport, ReportReason, ReportStatus};

fn parse_object_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,

    title: String,
    description: String,
    price: f64,
    category: ListingCategory,
    images: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,

    user_id: String,
    user_name: String,
    user_email: String,
    phone_number: String,
    location: ListingLocation,

    #[serde(default)]
    is_paid: bool,
    #[serde(default)]
    payment_id: Option<String>,

    #[serde(default)]
    status: ListingStatus,
    #[serde(default)]
    report_count: i64,

    created_at: i64,
}

impl MongoDbObject for ListingDocument {
    const COLLECTION_NAME: &'static str = "listings";

    fn get_id(&self) -> Option<ObjectId> {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }
}

impl From<Listing> for ListingDocument {
    fn from(listing: Listing) -> Self {
        Self {
            id: parse_object_id(&listing.id),
            title: listing.title,
            description: listing.description,
            price: listing.price,
            category: listing.category,
            images: listing.images,
            tags: listing.tags,
            user_id: listing.user_id,
            user_name: listing.user_name,
            user_email: listing.user_email,
            phone_number: listing.phone_number,
            location: listing.location,
            is_paid: listing.is_paid,
            payment_id: listing.payment_id,
            status: listing.status,
            report_count: listing.report_count,
            created_at: listing.created_at,
        }
    }
}

impl From<ListingDocument> for Listing {
    fn from(doc: ListingDocument) -> Self {
        Self {
            id: doc.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: doc.title,
            description: doc.description,
            price: doc.price,
            category: doc.category,
            images: doc.images,
            tags: doc.tags,
            user_id: doc.user_id,
            user_name: doc.user_name,
            user_email: doc.user_email,
            phone_number: doc.phone_number,
            location: doc.location,
            is_paid: doc.is_paid,
            payment_id: doc.payment_id,
            status: doc.status,
            report_count: doc.report_count,
            created_at: doc.created_at,
        }
    }
}

fn listing_filter(filter: &ListingFilter) -> Document {
    let mut query = Document::new();
    if let Some(category) = filter.category {
        query.insert("category", category.as_str());
    }
    if let Some(city) = &filter.city {
        query.insert("location.city", city.as_str());
    }
    if let Some(user_id) = &filter.user_id {
        query.insert("userId", user_id.as_str());
    }
    query
}

#[derive(Clone)]
pub struct MongoListingStore {
    db: Database,
}

impl MongoListingStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ListingStore for MongoListingStore {
    async fn insert(&self, listing: Listing) -> Result<Listing> {
        let doc = ListingDocument::from(listing);
        Ok(doc.insert(&self.db).await?.into())
    }

    async fn find_page(&self, filter: &ListingFilter, skip: u64, limit: i64) -> Result<Vec<Listing>> {
        let docs = ListingDocument::find_many(
            &self.db,
            listing_filter(filter),
            Some(doc! { "createdAt": -1, "_id": -1 }),
            Some(skip),
            Some(limit),
        )
        .await?;
        Ok(docs.into_iter().map(Listing::from).collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Listing>> {
        let Some(oid) = parse_object_id(id) else {
            return Ok(None);
        };
        Ok(ListingDocument::find_by_id(&self.db, &oid).await?.map(Listing::from))
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let Some(oid) = parse_object_id(id) else {
            return Ok(false);
        };
        ListingDocument::delete_by_id(&self.db, &oid).await
    }

    async fn increment_report_count(&self, id: &str, review_threshold: i64) -> Result<Option<Listing>> {
        let Some(oid) = parse_object_id(id) else {
            return Ok(None);
        };

        // Both stages run inside one findAndModify, so concurrent reports
        // cannot lose increments.
        let pipeline = vec![
            doc! { "$set": {
                "reportCount": { "$add": [ { "$ifNull": ["$reportCount", 0_i64] }, 1_i64 ] },
            }},
            doc! { "$set": {
                "status": {
                    "$cond": [
                        { "$gte": ["$reportCount", review_threshold] },
                        "underReview",
                        { "$ifNull": ["$status", "active"] },
                    ]
                },
            }},
        ];

        Ok(ListingDocument::find_one_and_update(&self.db, doc! { "_id": oid }, pipeline, false)
            .await?
            .map(Listing::from))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuotaDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    user_id: String,
    #[serde(default)]
    free_listings_count: i64,
    #[serde(default)]
    paid_listings_count: i64,
    #[serde(default)]
    total_paid_amount: i64,
    #[serde(default)]
    last_payment_date: Option<i64>,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    updated_at: i64,
}

impl MongoDbObject for QuotaDocument {
    const COLLECTION_NAME: &'static str = "user_stats";

    fn get_id(&self) -> Option<ObjectId> {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }
}

impl From<QuotaDocument> for UserQuota {
    fn from(doc: QuotaDocument) -> Self {
        Self {
            user_id: doc.user_id,
            free_listings_count: doc.free_listings_count,
            paid_listings_count: doc.paid_listings_count,
            total_paid_amount: doc.total_paid_amount,
            last_payment_date: doc.last_payment_date,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsedPaymentDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    payment_id: String,
    user_id: String,
    claimed_at: i64,
}

impl MongoDbObject for UsedPaymentDocument {
    const COLLECTION_NAME: &'static str = "used_payments";

    fn get_id(&self) -> Option<ObjectId> {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }
}

#[derive(Clone)]
pub struct MongoQuotaStore {
    db: Database,
}

impl MongoQuotaStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn fresh_counters(now: i64) -> Document {
        doc! {
            "freeListingsCount": 0_i64,
            "paidListingsCount": 0_i64,
            "totalPaidAmount": 0_i64,
            "lastPaymentDate": Bson::Null,
            "createdAt": now,
            "updatedAt": now,
        }
    }
}

#[async_trait]
impl QuotaStore for MongoQuotaStore {
    async fn get_or_create(&self, user_id: &str) -> Result<UserQuota> {
        let filter = doc! { "userId": user_id };
        let update = doc! { "$setOnInsert": Self::fresh_counters(get_current_timestamp()) };

        let quota = match QuotaDocument::find_one_and_update(&self.db, filter.clone(), update, true).await {
            Ok(quota) => quota,
            // Lost an upsert race against another request for the same user.
            Err(e) if is_duplicate_key_error(&e) => QuotaDocument::find_one_by_filter(&self.db, filter).await?,
            Err(e) => return Err(e),
        };

        quota
            .map(UserQuota::from)
            .ok_or_else(|| anyhow!("quota record for {} missing after upsert", user_id))
    }

    async fn try_consume_free_slot(&self, user_id: &str, limit: i64) -> Result<Option<UserQuota>> {
        self.get_or_create(user_id).await?;

        let filter = doc! { "userId": user_id, "freeListingsCount": { "$lt": limit } };
        let update = doc! {
            "$inc": { "freeListingsCount": 1_i64 },
            "$set": { "updatedAt": get_current_timestamp() },
        };

        Ok(QuotaDocument::find_one_and_update(&self.db, filter, update, false)
            .await?
            .map(UserQuota::from))
    }

    async fn record_paid_listing(&self, user_id: &str, amount: i64, paid_at: i64) -> Result<UserQuota> {
        let filter = doc! { "userId": user_id };
        let update = doc! {
            "$inc": { "paidListingsCount": 1_i64, "totalPaidAmount": amount },
            "$set": { "lastPaymentDate": paid_at, "updatedAt": paid_at },
            "$setOnInsert": { "freeListingsCount": 0_i64, "createdAt": paid_at },
        };

        QuotaDocument::find_one_and_update(&self.db, filter, update, true)
            .await?
            .map(UserQuota::from)
            .ok_or_else(|| anyhow!("quota record for {} missing after update", user_id))
    }

    async fn claim_payment(&self, payment_id: &str, user_id: &str) -> Result<bool> {
        let claim = UsedPaymentDocument {
            id: None,
            payment_id: payment_id.to_string(),
            user_id: user_id.to_string(),
            claimed_at: get_current_timestamp(),
        };

        match claim.insert(&self.db).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key_error(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    listing_id: String,
    reason: ReportReason,
    description: String,
    reported_by: String,
    status: ReportStatus,
    created_at: i64,
}

impl MongoDbObject for ReportDocument {
    const COLLECTION_NAME: &'static str = "reports";

    fn get_id(&self) -> Option<ObjectId> {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }
}

#[derive(Clone)]
pub struct MongoReportStore {
    db: Database,
}

impl MongoReportStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReportStore for MongoReportStore {
    async fn insert(&self, report: ListingReport) -> Result<ListingReport> {
        let doc = ReportDocument {
            id: None,
            listing_id: report.listing_id,
            reason: report.reason,
            description: report.description,
            reported_by: report.reported_by,
            status: report.status,
            created_at: report.created_at,
        };

        let doc = doc.insert(&self.db).await?;
        Ok(ListingReport {
            id: doc.id.map(|id| id.to_hex()).unwrap_or_default(),
            listing_id: doc.listing_id,
            reason: doc.reason,
            description: doc.description,
            reported_by: doc.reported_by,
            status: doc.status,
            created_at: doc.created_at,
        })
    }
}

/// Creates the indexes the stores rely on. The unique indexes back the
/// one-record-per-user quota and the payment replay guard.
pub async fn ensure_indexes(db: &Database) -> Result<()> {
    ListingDocument::ensure_index(db, doc! { "createdAt": -1, "_id": -1 }, false).await?;
    ListingDocument::ensure_index(db, doc! { "userId": 1, "createdAt": -1 }, false).await?;
    ListingDocument::ensure_index(db, doc! { "category": 1, "createdAt": -1 }, false).await?;
    QuotaDocument::ensure_index(db, doc! { "userId": 1 }, true).await?;
    UsedPaymentDocument::ensure_index(db, doc! { "paymentId": 1 }, true).await?;
    ReportDocument::ensure_index(db, doc! { "listingId": 1 }, false).await?;

    tracing::info!("[mongo] Indexes ensured");
    Ok(())
}
