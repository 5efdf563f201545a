use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};
use lazy_static::lazy_static;

lazy_static! {

    // Listings
    pub static ref LISTINGS_CREATED: IntCounterVec =
        register_int_counter_vec!("listings_created", "Number of listings created", &["kind"]).unwrap();

    pub static ref LISTING_CREATION_REJECTED: IntCounterVec =
        register_int_counter_vec!("listing_creation_rejected", "Number of rejected listing creations", &["reason"]).unwrap();

    pub static ref IMAGES_UPLOADED: IntCounter =
        register_int_counter!("images_uploaded", "Number of listing images stored").unwrap();

    // Payments
    pub static ref PAYMENT_VERIFICATIONS: IntCounterVec =
        register_int_counter_vec!("payment_verifications", "Number of payment verifications", &["method", "outcome"]).unwrap();
}

/// Prometheus text exposition of the default registry.
pub fn render() -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
