mod client;
mod crypto;
mod env;

pub use client::ModuleClient;
pub use crypto::{hmac_sha256_hex, verify_hmac_sha256_hex};
pub use env::{optional_env_var, required_env_var, EnvVars};

pub fn get_current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

pub fn get_current_timestamp_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
