//! Error handling utilities for HTTP calls

use mememori_core::DomainError;

/// Longest response body kept in an error message
const MAX_BODY_IN_ERROR: usize = 512;

/// Convert a reqwest error to DomainError
pub fn map_http_error(e: reqwest::Error) -> DomainError {
    if e.is_decode() {
        DomainError::Decode(e.to_string())
    } else if e.is_builder() {
        DomainError::ValidationError(e.to_string())
    } else if let Some(status) = e.status() {
        DomainError::backend(status.as_u16(), e.to_string())
    } else {
        DomainError::Network(e.to_string())
    }
}

/// Build a backend error from a non-success status and its body
pub fn status_error(status: reqwest::StatusCode, body: &str) -> DomainError {
    let body = body.trim();
    let message = if body.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        truncate(body, MAX_BODY_IN_ERROR).to_string()
    };
    DomainError::backend(status.as_u16(), message)
}

fn truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
