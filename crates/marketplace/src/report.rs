use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::validation::ValidationErrors;

/// Number of reports after which a listing is pulled for review.
pub const REVIEW_THRESHOLD: i64 = 3;

const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportReason {
    #[serde(rename = "Inappropriate content")]
    InappropriateContent,
    #[serde(rename = "Fake listing")]
    FakeListing,
    #[serde(rename = "Incorrect price")]
    IncorrectPrice,
    #[serde(rename = "Item already sold")]
    AlreadySold,
    Spam,
    #[serde(rename = "Duplicate listing")]
    Duplicate,
    #[serde(rename = "Wrong category")]
    WrongCategory,
    #[serde(rename = "Prohibited item")]
    ProhibitedItem,
    #[serde(rename = "Fraudulent seller")]
    FraudulentSeller,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Reviewed,
    Resolved,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub reason: ReportReason,
    #[serde(default)]
    pub description: String,
}

impl ReportRequest {
    pub(crate) fn validate(&self) -> Result<String, MarketError> {
        let description = self.description.trim().to_string();
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            let mut errors = ValidationErrors::default();
            errors.add(
                "description",
                format!("Description must be at most {} characters", MAX_DESCRIPTION_CHARS),
            );
            return Err(MarketError::Validation(errors));
        }
        Ok(description)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingReport {
    pub id: String,
    pub listing_id: String,
    pub reason: ReportReason,
    pub description: String,
    pub reported_by: String,
    pub status: ReportStatus,
    pub created_at: i64,
}
