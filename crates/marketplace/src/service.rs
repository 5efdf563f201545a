use std::sync::Arc;

use bazaar_common::get_current_timestamp_millis;

use crate::error::MarketError;
use crate::images::ImageIngestor;
use crate::listing::{is_valid_listing_id, Listing, ListingFilter, ListingLocation, ListingOwner, ListingPage, ListingStatus};
use crate::quota::QuotaLedger;
use crate::report::{ListingReport, ReportRequest, ReportStatus, REVIEW_THRESHOLD};
use crate::store::{ListingStore, ReportStore};
use crate::validation::{validate_listing, CreateListingInput};

pub const DEFAULT_PAGE_SIZE: u64 = 8;
pub const MAX_PAGE_SIZE: u64 = 50;

/// Listing lifecycle: creation through the quota gate, browsing, reporting
/// and deletion with image cleanup.
#[derive(Clone)]
pub struct ListingService {
    listings: Arc<dyn ListingStore>,
    reports: Arc<dyn ReportStore>,
    images: ImageIngestor,
    quota: QuotaLedger,
}

impl ListingService {
    pub fn new(
        listings: Arc<dyn ListingStore>,
        reports: Arc<dyn ReportStore>,
        images: ImageIngestor,
        quota: QuotaLedger,
    ) -> Self {
        Self { listings, reports, images, quota }
    }

    pub fn quota(&self) -> &QuotaLedger {
        &self.quota
    }

    pub fn images(&self) -> &ImageIngestor {
        &self.images
    }

    pub async fn create(&self, owner: &ListingOwner, input: CreateListingInput) -> Result<Listing, MarketError> {
        let normalized = validate_listing(&input).map_err(MarketError::Validation)?;

        // Fail fast before uploading anything when the user clearly has to pay.
        if input.payment.is_none() {
            self.quota.precheck(&owner.user_id).await?;
        }

        let image_urls = self.images.ingest(&normalized.images).await?;

        let charge = match self.quota.consume(&owner.user_id, input.payment.as_ref()).await {
            Ok(charge) => charge,
            Err(e) => {
                self.images.remove(&image_urls).await;
                return Err(e);
            }
        };

        let listing = Listing {
            id: String::new(),
            title: normalized.title,
            description: normalized.description,
            price: normalized.price,
            category: normalized.category,
            images: image_urls.clone(),
            tags: normalized.tags,
            user_id: owner.user_id.clone(),
            user_name: owner.display_name_or_default(),
            user_email: owner.email_or_default(),
            phone_number: normalized.phone_number,
            location: ListingLocation {
                address: normalized.location_address,
                city: normalized.location_city,
                coordinates: normalized.coordinates,
            },
            is_paid: charge.is_paid(),
            payment_id: charge.payment_id().map(str::to_string),
            status: ListingStatus::Active,
            report_count: 0,
            created_at: get_current_timestamp_millis(),
        };

        match self.listings.insert(listing).await {
            Ok(listing) => {
                tracing::info!(
                    "[ListingService::create] User {} created listing {} (paid: {})",
                    owner.user_id,
                    listing.id,
                    listing.is_paid
                );
                Ok(listing)
            }
            Err(e) => {
                tracing::error!(
                    "[ListingService::create] Failed to persist listing for user {}, consumed quota slot is not refunded: {:?}",
                    owner.user_id,
                    e
                );
                self.images.remove(&image_urls).await;
                Err(MarketError::Dependency(e.context("Failed to create listing")))
            }
        }
    }

    /// `page` is 1-based. Missing or zero values fall back to the defaults.
    pub async fn list(
        &self,
        filter: &ListingFilter,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<ListingPage, MarketError> {
        let page = page.unwrap_or(1).max(1);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let skip = (page - 1).saturating_mul(page_size).min(i64::MAX as u64);

        // One extra row tells us whether another page exists.
        let mut listings = self.listings.find_page(filter, skip, page_size as i64 + 1).await?;
        let has_more = listings.len() as u64 > page_size;
        listings.truncate(page_size as usize);

        Ok(ListingPage { listings, page, page_size, has_more })
    }

    /// `Ok(None)` for a well-formed id that does not exist.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Listing>, MarketError> {
        if !is_valid_listing_id(id) {
            return Err(MarketError::InvalidId(id.to_string()));
        }
        Ok(self.listings.find_by_id(id).await?)
    }

    /// Removes the listing record, then its images. Image cleanup failures
    /// are logged and do not fail the call.
    pub async fn delete(&self, id: &str) -> Result<(), MarketError> {
        let listing = self.load(id).await?;
        self.delete_listing(listing).await
    }

    /// Same as [`ListingService::delete`] but only for the listing's owner.
    pub async fn delete_owned(&self, id: &str, user_id: &str) -> Result<(), MarketError> {
        let listing = self.load(id).await?;
        if listing.user_id != user_id {
            return Err(MarketError::Forbidden("You can only delete your own listings".to_string()));
        }
        self.delete_listing(listing).await
    }

    async fn load(&self, id: &str) -> Result<Listing, MarketError> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Listing {}", id)))
    }

    async fn delete_listing(&self, listing: Listing) -> Result<(), MarketError> {
        if !self.listings.delete_by_id(&listing.id).await? {
            return Err(MarketError::NotFound(format!("Listing {}", listing.id)));
        }

        let failed = self.images.remove(&listing.images).await;
        if failed > 0 {
            tracing::warn!(
                "[ListingService::delete] Listing {} deleted, {} of {} images left behind",
                listing.id,
                failed,
                listing.images.len()
            );
        } else {
            tracing::info!("[ListingService::delete] Listing {} deleted", listing.id);
        }

        Ok(())
    }

    /// Files a report and bumps the listing's report counter. The listing is
    /// put under review once it collects enough reports.
    pub async fn report(
        &self,
        listing_id: &str,
        reporter: &ListingOwner,
        request: ReportRequest,
    ) -> Result<ListingReport, MarketError> {
        let description = request.validate()?;
        self.load(listing_id).await?;

        let report = self.reports
            .insert(ListingReport {
                id: String::new(),
                listing_id: listing_id.to_string(),
                reason: request.reason,
                description,
                reported_by: reporter.email.clone().unwrap_or_else(|| reporter.user_id.clone()),
                status: ReportStatus::Pending,
                created_at: get_current_timestamp_millis(),
            })
            .await?;

        let listing = self.listings
            .increment_report_count(listing_id, REVIEW_THRESHOLD)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Listing {}", listing_id)))?;

        if listing.status == ListingStatus::UnderReview {
            tracing::warn!(
                "[ListingService::report] Listing {} under review after {} reports",
                listing.id,
                listing.report_count
            );
        }

        Ok(report)
    }
}
