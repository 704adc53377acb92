//! Client IP extractor used to key the rate limiter.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// The caller's IP address as reported by proxy headers.
///
/// Checks `x-forwarded-for` (first entry) then `x-real-ip`; falls back to
/// `"unknown"` so a missing header degrades to one shared rate-limit bucket
/// rather than an error.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(forwarded) = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
        {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return Ok(ClientIp(first.to_string()));
                }
            }
        }

        if let Some(real_ip) = parts.headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
            let real_ip = real_ip.trim();
            if !real_ip.is_empty() {
                return Ok(ClientIp(real_ip.to_string()));
            }
        }

        Ok(ClientIp("unknown".to_string()))
    }
}
