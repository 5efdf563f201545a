mod error;
mod images;
mod listing;
mod payment;
mod quota;
mod report;
mod service;
mod upi;
mod validation;

pub mod store;

pub use error::MarketError;
pub use images::{
    image_url, object_id_from_url, ImageIngestor, InlineImage,
    IMAGE_URL_PREFIX, MAX_IMAGES, MAX_IMAGE_SIZE_BYTES, MIN_IMAGES,
};
pub use listing::{
    is_valid_listing_id, GeoPoint, Listing, ListingCategory, ListingFilter, ListingLocation,
    ListingOwner, ListingPage, ListingStatus,
};
pub use payment::{
    GatewayOrder, GatewayPayment, PaymentConfirmation, PaymentOrder, PaymentService,
    PaymentVerificationRequest, CAPTURED_STATUS,
};
pub use quota::{ListingCharge, QuotaLedger, QuotaPolicy, QuotaStatus, UserQuota};
pub use report::{ListingReport, ReportReason, ReportRequest, ReportStatus, REVIEW_THRESHOLD};
pub use service::{ListingService, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use upi::{UpiVerification, UpiVerificationRequest, UpiVerifier};
pub use validation::{
    canonicalize_phone, validate_listing, CreateListingInput, NormalizedListing, PriceInput,
    ValidationErrors,
};
