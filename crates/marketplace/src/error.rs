use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Free listing quota exhausted, a payment of {fee} is required to publish this listing")]
    QuotaExceeded { fee: i64 },

    #[error("Invalid payment: {0}")]
    InvalidPayment(String),

    #[error("Payment not captured")]
    PaymentNotCaptured,

    #[error("Payment {0} has already been used")]
    PaymentAlreadyUsed(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Dependency(#[from] anyhow::Error),
}

impl MarketError {
    pub fn status_code(&self) -> u16 {
        match self {
            MarketError::Validation(_)
            | MarketError::InvalidPayment(_)
            | MarketError::PaymentNotCaptured
            | MarketError::InvalidImage(_)
            | MarketError::InvalidId(_) => 400,
            MarketError::QuotaExceeded { .. } => 402,
            MarketError::Forbidden(_) => 403,
            MarketError::NotFound(_) => 404,
            MarketError::PaymentAlreadyUsed(_) => 409,
            MarketError::Dependency(_) => 500,
        }
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            MarketError::Validation(_) => "validation",
            MarketError::QuotaExceeded { .. } => "quota_exceeded",
            MarketError::InvalidPayment(_) => "invalid_payment",
            MarketError::PaymentNotCaptured => "not_captured",
            MarketError::PaymentAlreadyUsed(_) => "payment_replayed",
            MarketError::InvalidImage(_) => "invalid_image",
            MarketError::InvalidId(_) => "invalid_id",
            MarketError::NotFound(_) => "not_found",
            MarketError::Forbidden(_) => "forbidden",
            MarketError::Dependency(_) => "dependency",
        }
    }
}
