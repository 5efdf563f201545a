use anyhow::anyhow;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use tracing_subscriber::EnvFilter;

use crate::response::AppError;

pub fn extract_bearer_token(req: &Request) -> Result<String, AppError> {
    let auth_header = req.headers().get(header::AUTHORIZATION);

    match auth_header {
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|e| AppError::new(StatusCode::UNAUTHORIZED, anyhow!("unreadable authorization header: {}", e)))?
                .split_whitespace()
                .collect::<Vec<_>>();

            if value.len() != 2 || value[0] != "Bearer" {
                return Err(AppError::new(
                    StatusCode::UNAUTHORIZED,
                    anyhow!("invalid authorization header"),
                ));
            }

            Ok(value[1].to_string())
        }
        _ => {
            Err(AppError::new(
                StatusCode::UNAUTHORIZED,
                anyhow!("missing authorization header"),
            ))
        }
    }
}

/// Installs the global subscriber. Level comes from `RUST_LOG`, `info` by default.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(header_value: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(value) = header_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_bearer_token(&request_with(Some("Bearer abc.def"))).unwrap(), "abc.def");
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        for value in [None, Some("Basic abc"), Some("Bearer"), Some("Bearer a b")] {
            let err = extract_bearer_token(&request_with(value)).unwrap_err();
            assert_eq!(err.0, StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn opaque_header_bytes_are_unauthorized() {
        let value = axum::http::HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap();
        let req = axum::http::Request::builder()
            .uri("/")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap();

        let err = extract_bearer_token(&req).unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }
}
