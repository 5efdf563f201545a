use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` keyed with `secret`.
pub fn hmac_sha256_hex(secret: &str, payload: &str) -> String {
    // HMAC accepts keys of any length, `new_from_slice` cannot fail here
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC accepts any key length"),
    };
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Checks a hex signature against the HMAC-SHA256 of `payload` in constant time.
pub fn verify_hmac_sha256_hex(secret: &str, payload: &str, signature: &str) -> bool {
    let expected = hmac_sha256_hex(secret, payload);
    expected.len() == signature.len() && expected.as_bytes().ct_eq(signature.as_bytes()).into()
}
