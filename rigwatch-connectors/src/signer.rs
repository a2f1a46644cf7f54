//! Request signing.
//!
//! Every request to the rig management API carries an `X-Auth` header of
//! the form `{apiKey}:{hex(HMAC-SHA256(apiSecret, input))}`.
//!
//! # Canonical input
//!
//! ```text
//! apiKey \0 time \0 nonce \0 \0 orgId \0 \0 METHOD \0 endpoint \0 [query] [\0 body]
//! ```
//!
//! The two empty fields are reserved by the scheme and must stay present.
//! The query (if any) follows with no separator; the body (if any) is
//! preceded by one more `\0`.

use hmac::{Hmac, Mac};
use rigwatch_domain::Credentials;
use sha2::Sha256;

use crate::error::RigApiError;

type HmacSha256 = Hmac<Sha256>;

/// Query component of a signed request.
#[derive(Debug, Clone, Copy)]
pub enum SignQuery<'a> {
    /// Key/value pairs, URL-encoded in the given order
    Pairs(&'a [(&'a str, &'a str)]),
    /// Already encoded query string
    Raw(&'a str),
}

/// Body component of a signed request.
#[derive(Debug, Clone, Copy)]
pub enum SignBody<'a> {
    /// Structured body, signed as compact JSON
    Json(&'a serde_json::Value),
    /// Raw body text
    Raw(&'a str),
}

/// Compute the `X-Auth` token for a request.
///
/// Pure: identical inputs always produce the identical token.
pub fn sign(
    method: &str,
    endpoint: &str,
    time: i64,
    nonce: &str,
    credentials: &Credentials,
    query: Option<SignQuery<'_>>,
    body: Option<SignBody<'_>>,
) -> Result<String, RigApiError> {
    let mut mac = HmacSha256::new_from_slice(credentials.api_secret().as_bytes())
        .map_err(|e| RigApiError::Signature(format!("HMAC error: {}", e)))?;

    mac.update(canonical_prefix(method, endpoint, time, nonce, credentials).as_bytes());

    if let Some(query) = query {
        match query {
            SignQuery::Pairs(pairs) => mac.update(encode_query(pairs).as_bytes()),
            SignQuery::Raw(raw) => mac.update(raw.as_bytes()),
        }
    }

    if let Some(body) = body {
        let text = match body {
            SignBody::Json(value) => value.to_string(),
            SignBody::Raw(raw) => raw.to_string(),
        };
        if !text.is_empty() {
            mac.update(b"\0");
            mac.update(text.as_bytes());
        }
    }

    let digest = hex::encode(mac.finalize().into_bytes());
    Ok(format!("{}:{}", credentials.api_key(), digest))
}

/// Fixed part of the HMAC input.
fn canonical_prefix(
    method: &str,
    endpoint: &str,
    time: i64,
    nonce: &str,
    credentials: &Credentials,
) -> String {
    format!(
        "{}\0{}\0{}\0\0{}\0\0{}\0{}\0",
        credentials.api_key(),
        time,
        nonce,
        credentials.org_id(),
        method.to_uppercase(),
        endpoint
    )
}

/// URL-encode query pairs, escaping like `encodeURIComponent`.
fn encode_query(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", escape_component(k), escape_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn escape_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
