use anyhow::{anyhow, Result};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use bazaar_common::{get_current_timestamp, hmac_sha256_hex, verify_hmac_sha256_hex};
use bazaar_marketplace::ListingOwner;

use crate::global_state::GlobalState;
use crate::response::AppError;
use crate::utils::extract_bearer_token;

/// Sessions are valid for one hour after issue.
pub const SESSION_TTL_SECS: i64 = 60 * 60;
const CLOCK_SKEW_SECS: i64 = 60;

/// Identity claims issued by the sign-in provider and trusted as-is once the
/// signature checks out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub issued_at: i64,
}

impl SessionClaims {
    /// `base64url(json).hex(hmac_sha256(secret, base64url(json)))`
    pub fn sign(&self, secret: &str) -> Result<String> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?);
        let signature = hmac_sha256_hex(secret, &payload);
        Ok(format!("{}.{}", payload, signature))
    }

    pub fn verify(token: &str, secret: &str, now: i64) -> Result<Self> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| anyhow!("malformed session token"))?;

        if !verify_hmac_sha256_hex(secret, payload, signature) {
            return Err(anyhow!("invalid session signature"));
        }

        let decoded = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| anyhow!("malformed session payload: {}", e))?;
        let claims: SessionClaims = serde_json::from_slice(&decoded)?;

        if claims.user_id.trim().is_empty() {
            return Err(anyhow!("session has no user"));
        }
        if claims.issued_at > now + CLOCK_SKEW_SECS {
            return Err(anyhow!("session issued in the future"));
        }
        if now - claims.issued_at > SESSION_TTL_SECS {
            return Err(anyhow!("session expired"));
        }

        Ok(claims)
    }

    pub fn owner(&self) -> ListingOwner {
        ListingOwner {
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}

pub async fn authenticate(
    State(state): State<GlobalState>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let token = extract_bearer_token(&req)?;
    let claims = SessionClaims::verify(&token, &state.secret_salt, get_current_timestamp())
        .map_err(|e| AppError::new(StatusCode::UNAUTHORIZED, e))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
