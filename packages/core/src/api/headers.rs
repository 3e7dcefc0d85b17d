//! Conditional-request helpers for cached JSON responses.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use chrono::{DateTime, Utc};

use crate::error::AppError;

/// Freshness hints sent with a cached body.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub max_age: u32,
    pub stale_while_revalidate: u32,
}

impl CachePolicy {
    fn header_value(&self) -> HeaderValue {
        // Digits and ASCII only, always a valid header value.
        HeaderValue::from_str(&format!(
            "max-age={}, stale-while-revalidate={}",
            self.max_age, self.stale_while_revalidate
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
    }
}

/// Compute a weakly-stable quoted ETag from response bytes.
pub fn compute_etag(body: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("\"{:x}\"", hasher.finish())
}

/// RFC 7231 HTTP-date.
pub fn http_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Returns true when `If-None-Match` contains `*` or the exact current ETag.
pub fn if_none_match_matches(headers: &HeaderMap, current_etag: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(|raw| {
            raw.split(',')
                .map(|tag| tag.trim())
                .any(|tag| tag == "*" || tag == current_etag)
        })
        .unwrap_or(false)
}

/// Serialize `body` as JSON with ETag, Cache-Control and Last-Modified,
/// answering 304 when the client already holds this version.
pub fn cached_json<T: serde::Serialize>(
    request_headers: &HeaderMap,
    policy: CachePolicy,
    modified: DateTime<Utc>,
    body: &T,
) -> Result<Response, AppError> {
    let bytes = serde_json::to_vec(body).map_err(|err| AppError::Parse(err.to_string()))?;
    let etag = compute_etag(&bytes);

    let (status, body) = if if_none_match_matches(request_headers, &etag) {
        (StatusCode::NOT_MODIFIED, Body::empty())
    } else {
        (StatusCode::OK, Body::from(bytes))
    };

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CACHE_CONTROL, policy.header_value())
        .header(header::ETAG, etag)
        .header(header::LAST_MODIFIED, http_date(modified))
        .body(body)
        .map_err(|err| AppError::Unknown(err.to_string()))
}
