#[cfg(feature = "r2")]
mod r2;
#[cfg(feature = "razorpay")]
mod razorpay;

#[cfg(feature = "r2")]
pub use r2::{R2Client, R2Connection, StoredBlob};
#[cfg(feature = "razorpay")]
pub use razorpay::{
    CreateOrderRequest, RazorpayClient, RazorpayConnection, RazorpayOrder, RazorpayPayment,
};
