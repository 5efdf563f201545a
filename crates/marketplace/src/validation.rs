use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::images::{InlineImage, MAX_IMAGES, MAX_IMAGE_SIZE_MB, MIN_IMAGES};
use crate::listing::{GeoPoint, ListingCategory};
use crate::payment::PaymentVerificationRequest;

pub const COUNTRY_CODE: &str = "+91";
pub const MAX_TAGS: usize = 10;

/// Raw create-listing payload as submitted by the client. Every field
/// defaults so that a structurally valid but incomplete body reaches
/// validation instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateListingInput {
    pub title: String,
    pub description: String,
    pub price: Option<PriceInput>,
    pub category: String,
    pub phone_number: String,
    pub tags: Vec<String>,
    pub location_address: String,
    pub location_city: String,
    pub coordinates: Option<GeoPoint>,
    pub images: Vec<String>,
    /// Present when the caller is paying for this listing.
    pub payment: Option<PaymentVerificationRequest>,
}

/// Prices arrive either as JSON numbers or as form strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    fn coerce(&self) -> Option<f64> {
        let value = match self {
            PriceInput::Number(n) => *n,
            PriceInput::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    0.0
                } else {
                    s.parse::<f64>().ok()?
                }
            }
        };
        value.is_finite().then_some(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedListing {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: ListingCategory,
    pub phone_number: String,
    pub tags: Vec<String>,
    pub location_address: String,
    pub location_city: String,
    pub coordinates: Option<GeoPoint>,
    /// Still-encoded inline payloads, in submission order.
    pub images: Vec<String>,
}

/// Field-keyed error messages, kept in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    fields: Vec<(&'static str, Vec<String>)>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        let message = message.into();
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some((_, messages)) => messages.push(message),
            None => self.fields.push((field, vec![message])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(f, _)| *f).collect()
    }

    pub fn messages(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, m)| m.as_slice())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.messages(field).is_some()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid input data.")?;
        for (field, messages) in &self.fields {
            write!(f, " {}: {}.", field, messages.join(", "))?;
        }
        Ok(())
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, messages) in &self.fields {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

/// Strips spaces, hyphens and a leading country code, then re-applies the
/// canonical `+91` prefix. `None` unless exactly ten digits remain.
pub fn canonicalize_phone(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let digits = compact.strip_prefix(COUNTRY_CODE).unwrap_or(&compact);

    if digits.len() == 10 && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(format!("{}{}", COUNTRY_CODE, digits))
    } else {
        None
    }
}

fn check_length(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.chars().count();
    if len < min {
        errors.add(field, format!("{} must be at least {} characters", label, min));
    }
    if len > max {
        errors.add(field, format!("{} must be at most {} characters", label, max));
    }
}

/// Checks every field constraint and reports all violations together.
pub fn validate_listing(input: &CreateListingInput) -> Result<NormalizedListing, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title = input.title.trim().to_string();
    check_length(&mut errors, "title", "Title", &title, 5, 100);

    let description = input.description.trim().to_string();
    check_length(&mut errors, "description", "Description", &description, 20, 5000);

    let price = match input.price.as_ref().map(PriceInput::coerce) {
        None => {
            errors.add("price", "Price is required");
            None
        }
        Some(None) => {
            errors.add("price", "Price must be a number");
            None
        }
        Some(Some(p)) if p < 0.0 => {
            errors.add("price", "Price must be a positive number");
            None
        }
        Some(Some(p)) => Some(p),
    };

    let category = match input.category.trim() {
        "" => {
            errors.add("category", "Please select a category");
            None
        }
        raw => match raw.parse::<ListingCategory>() {
            Ok(c) => Some(c),
            Err(_) => {
                errors.add("category", "Category must be one of the predefined listing categories");
                None
            }
        },
    };

    let phone_number = canonicalize_phone(&input.phone_number);
    if phone_number.is_none() {
        errors.add("phoneNumber", "Please enter a valid 10-digit phone number");
    }

    let tags: Vec<String> = input.tags.iter().map(|t| t.trim().to_string()).collect();
    for tag in &tags {
        let len = tag.chars().count();
        if len == 0 {
            errors.add("tags", "Tag cannot be empty");
        } else if len > 30 {
            errors.add("tags", "Tag must be at most 30 characters");
        }
    }
    if tags.len() > MAX_TAGS {
        errors.add("tags", format!("Maximum {} tags allowed.", MAX_TAGS));
    }

    let location_address = input.location_address.trim().to_string();
    check_length(&mut errors, "locationAddress", "Address", &location_address, 5, 200);

    let location_city = input.location_city.trim().to_string();
    check_length(&mut errors, "locationCity", "City", &location_city, 2, 50);

    if let Some(point) = input.coordinates {
        let lat_ok = point.lat.is_finite() && (-90.0..=90.0).contains(&point.lat);
        let lng_ok = point.lng.is_finite() && (-180.0..=180.0).contains(&point.lng);
        if !lat_ok || !lng_ok {
            errors.add("coordinates", "Coordinates must be a valid latitude/longitude pair");
        }
    }

    for (index, data_url) in input.images.iter().enumerate() {
        match InlineImage::estimated_decoded_len(data_url) {
            None => errors.add(
                "images",
                format!("Image {}: Invalid image format (must be data URI starting with 'data:image/').", index + 1),
            ),
            Some(size) if !InlineImage::size_within_limit(size) => errors.add(
                "images",
                format!("Image {}: Image size must be less than {}MB and not empty.", index + 1, MAX_IMAGE_SIZE_MB),
            ),
            Some(_) => {}
        }
    }
    if input.images.len() < MIN_IMAGES {
        errors.add("images", "At least one image is required");
    }
    if input.images.len() > MAX_IMAGES {
        errors.add("images", format!("Maximum {} images allowed.", MAX_IMAGES));
    }

    match (errors.is_empty(), price, category, phone_number) {
        (true, Some(price), Some(category), Some(phone_number)) => Ok(NormalizedListing {
            title,
            description,
            price,
            category,
            phone_number,
            tags,
            location_address,
            location_city,
            coordinates: input.coordinates,
            images: input.images.clone(),
        }),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> CreateListingInput {
        CreateListingInput {
            title: "Used mountain bike".to_string(),
            description: "Lightly used, serviced last month, new tyres.".to_string(),
            price: Some(PriceInput::Number(4500.0)),
            category: "Vehicles".to_string(),
            phone_number: "98765 43210".to_string(),
            tags: vec!["bike".to_string(), "cycling".to_string()],
            location_address: "12 MG Road, Indiranagar".to_string(),
            location_city: "Bengaluru".to_string(),
            coordinates: None,
            images: vec!["data:image/png;base64,iVBORw0KGgo=".to_string()],
            payment: None,
        }
    }

    fn only_failing_field(input: CreateListingInput) -> Vec<&'static str> {
        validate_listing(&input).unwrap_err().field_names()
    }

    #[test]
    fn accepts_valid_listing_and_canonicalizes_phone() {
        let listing = validate_listing(&valid_input()).unwrap();
        assert_eq!(listing.phone_number, "+919876543210");
        assert_eq!(listing.category, ListingCategory::Vehicles);
        assert_eq!(listing.price, 4500.0);
    }

    #[test]
    fn phone_variants_canonicalize_to_same_form() {
        for raw in ["9876543210", "+91 98765-43210", "+919876543210", " 98765 43210 "] {
            assert_eq!(canonicalize_phone(raw).as_deref(), Some("+919876543210"), "{raw}");
        }
        for raw in ["12345", "98765432101", "+1 9876543210", "98765abcde", ""] {
            assert_eq!(canonicalize_phone(raw), None, "{raw}");
        }
    }

    #[test]
    fn short_title_reports_only_title() {
        let mut input = valid_input();
        input.title = "Bike".to_string();
        assert_eq!(only_failing_field(input), vec!["title"]);
    }

    #[test]
    fn short_description_reports_only_description() {
        let mut input = valid_input();
        input.description = "Too short".to_string();
        assert_eq!(only_failing_field(input), vec!["description"]);
    }

    #[test]
    fn price_is_coerced_from_text() {
        let mut input = valid_input();
        input.price = Some(PriceInput::Text(" 1200.50 ".to_string()));
        assert_eq!(validate_listing(&input).unwrap().price, 1200.5);

        input.price = Some(PriceInput::Text("cheap".to_string()));
        assert_eq!(only_failing_field(input.clone()), vec!["price"]);

        input.price = Some(PriceInput::Number(-1.0));
        assert_eq!(only_failing_field(input.clone()), vec!["price"]);

        input.price = None;
        assert_eq!(only_failing_field(input), vec!["price"]);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let mut input = valid_input();
        input.category = "Weapons".to_string();
        assert_eq!(only_failing_field(input), vec!["category"]);
    }

    #[test]
    fn tag_constraints() {
        let mut input = valid_input();
        input.tags = vec!["".to_string()];
        assert_eq!(only_failing_field(input.clone()), vec!["tags"]);

        input.tags = vec!["x".repeat(31)];
        assert_eq!(only_failing_field(input.clone()), vec!["tags"]);

        input.tags = (0..11).map(|i| format!("tag{i}")).collect();
        assert_eq!(only_failing_field(input.clone()), vec!["tags"]);

        input.tags = (0..10).map(|i| format!("tag{i}")).collect();
        assert!(validate_listing(&input).is_ok());
    }

    #[test]
    fn location_constraints() {
        let mut input = valid_input();
        input.location_city = "X".to_string();
        assert_eq!(only_failing_field(input.clone()), vec!["locationCity"]);

        let mut input = valid_input();
        input.location_address = "abc".to_string();
        assert_eq!(only_failing_field(input), vec!["locationAddress"]);
    }

    #[test]
    fn image_count_bounds() {
        let image = "data:image/png;base64,iVBORw0KGgo=".to_string();

        let mut input = valid_input();
        input.images = vec![];
        assert_eq!(only_failing_field(input.clone()), vec!["images"]);

        input.images = vec![image.clone(); 6];
        assert_eq!(only_failing_field(input.clone()), vec!["images"]);

        for count in 1..=5 {
            input.images = vec![image.clone(); count];
            assert!(validate_listing(&input).is_ok(), "{count} images");
        }
    }

    #[test]
    fn non_image_payload_is_rejected() {
        let mut input = valid_input();
        input.images = vec!["data:text/plain;base64,aGVsbG8=".to_string()];
        assert_eq!(only_failing_field(input), vec!["images"]);
    }

    #[test]
    fn all_violations_are_reported_together() {
        let errors = validate_listing(&CreateListingInput::default()).unwrap_err();
        for field in ["title", "description", "price", "category", "phoneNumber", "locationAddress", "locationCity", "images"] {
            assert!(errors.contains(field), "{field}");
        }
        assert!(!errors.contains("tags"));
        assert!(errors.to_string().starts_with("Invalid input data. title:"));
    }

    #[test]
    fn errors_serialize_as_field_map() {
        let mut input = valid_input();
        input.title = "Bike".to_string();
        let errors = validate_listing(&input).unwrap_err();
        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(value["title"][0], "Title must be at least 5 characters");
    }
}
