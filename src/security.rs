use crate::errors::GateError;
use axum::http::{header::AUTHORIZATION, HeaderMap};

pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub fn require_bearer(headers: &HeaderMap, expected: &str) -> Result<(), GateError> {
    let token = extract_bearer(headers).ok_or(GateError::Unauthorized)?;
    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        return Err(GateError::Unauthorized);
    }
    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
