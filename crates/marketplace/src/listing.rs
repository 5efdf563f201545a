use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingCategory {
    Electronics,
    Vehicles,
    Property,
    #[serde(rename = "Home & Garden")]
    HomeAndGarden,
    #[serde(rename = "Fashion & Accessories")]
    FashionAndAccessories,
    #[serde(rename = "Books & Hobbies")]
    BooksAndHobbies,
    Services,
    Jobs,
    Other,
}

impl ListingCategory {
    pub const ALL: [ListingCategory; 9] = [
        ListingCategory::Electronics,
        ListingCategory::Vehicles,
        ListingCategory::Property,
        ListingCategory::HomeAndGarden,
        ListingCategory::FashionAndAccessories,
        ListingCategory::BooksAndHobbies,
        ListingCategory::Services,
        ListingCategory::Jobs,
        ListingCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingCategory::Electronics => "Electronics",
            ListingCategory::Vehicles => "Vehicles",
            ListingCategory::Property => "Property",
            ListingCategory::HomeAndGarden => "Home & Garden",
            ListingCategory::FashionAndAccessories => "Fashion & Accessories",
            ListingCategory::BooksAndHobbies => "Books & Hobbies",
            ListingCategory::Services => "Services",
            ListingCategory::Jobs => "Jobs",
            ListingCategory::Other => "Other",
        }
    }
}

impl fmt::Display for ListingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ListingCategory::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("{} is not a valid category", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingLocation {
    pub address: String,
    pub city: String,
    pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListingStatus {
    #[default]
    Active,
    UnderReview,
}

/// Public read shape of a listing. `id` is empty until the store assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,

    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: ListingCategory,
    pub images: Vec<String>,
    pub tags: Vec<String>,

    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub phone_number: String,
    pub location: ListingLocation,

    pub is_paid: bool,
    pub payment_id: Option<String>,

    pub status: ListingStatus,
    pub report_count: i64,

    pub created_at: i64,
}

/// Identity claims of the caller, captured into the listing at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingOwner {
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl ListingOwner {
    pub fn display_name_or_default(&self) -> String {
        self.display_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Anonymous User".to_string())
    }

    pub fn email_or_default(&self) -> String {
        self.email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "No Email Provided".to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    pub category: Option<ListingCategory>,
    pub city: Option<String>,
    pub user_id: Option<String>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        self.category.map_or(true, |c| listing.category == c)
            && self.city.as_ref().map_or(true, |c| &listing.location.city == c)
            && self.user_id.as_ref().map_or(true, |u| &listing.user_id == u)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub listings: Vec<Listing>,
    pub page: u64,
    pub page_size: u64,
    pub has_more: bool,
}

/// Listing ids are 24-character hex strings (MongoDB ObjectIds).
pub fn is_valid_listing_id(id: &str) -> bool {
    id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_display_names() {
        for category in ListingCategory::ALL {
            assert_eq!(category.as_str().parse::<ListingCategory>().unwrap(), category);
        }
        assert!("Weapons".parse::<ListingCategory>().is_err());
        assert!("electronics".parse::<ListingCategory>().is_err());
    }

    #[test]
    fn category_serializes_to_display_name() {
        let json = serde_json::to_string(&ListingCategory::HomeAndGarden).unwrap();
        assert_eq!(json, "\"Home & Garden\"");
    }

    #[test]
    fn listing_id_format() {
        assert!(is_valid_listing_id("65f1c2a9e4b0a1b2c3d4e5f6"));
        assert!(!is_valid_listing_id("65f1c2a9e4b0a1b2c3d4e5f"));
        assert!(!is_valid_listing_id("zzf1c2a9e4b0a1b2c3d4e5f6"));
        assert!(!is_valid_listing_id(""));
    }

    #[test]
    fn owner_defaults_for_missing_claims() {
        let owner = ListingOwner { user_id: "u1".into(), display_name: None, email: Some("  ".into()) };
        assert_eq!(owner.display_name_or_default(), "Anonymous User");
        assert_eq!(owner.email_or_default(), "No Email Provided");
    }
}
