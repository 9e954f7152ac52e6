//! Opaque token codec.
//!
//! Wire format: JSON bytes -> raw deflate -> base64 (URL-safe alphabet, no padding).
//! Changing any of the three steps breaks every token already handed out.

use crate::errors::{PageError, TokenFault};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use serde::Serialize;
use serde_json::Value;
use std::io::{Read, Write};

/// Upper bound on the inflated size of an untrusted token.
pub const DEFAULT_MAX_INFLATED_BYTES: usize = 1024 * 1024;

/// Encodes `payload` into an opaque token.
pub fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<String, PageError> {
    let json = serde_json::to_vec(payload)?;
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(json.len() / 2 + 16), Compression::best());
    encoder
        .write_all(&json)
        .map_err(|e| PageError::malformed(TokenFault::Compression, e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| PageError::malformed(TokenFault::Compression, e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

/// Decodes a token produced by [`encode`]. A missing token is malformed, not "no cursor".
pub fn decode(token: Option<&str>) -> Result<Value, PageError> {
    decode_with_limit(token, DEFAULT_MAX_INFLATED_BYTES)
}

pub fn decode_with_limit(token: Option<&str>, max_inflated: usize) -> Result<Value, PageError> {
    let token = match token.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return Err(PageError::malformed(TokenFault::Missing, "no token given")),
    };
    let compressed = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| PageError::malformed(TokenFault::Encoding, e.to_string()))?;

    let limit = u64::try_from(max_inflated).unwrap_or(u64::MAX).saturating_add(1);
    let mut inflated = Vec::new();
    DeflateDecoder::new(compressed.as_slice())
        .take(limit)
        .read_to_end(&mut inflated)
        .map_err(|e| PageError::malformed(TokenFault::Compression, e.to_string()))?;
    if inflated.len() > max_inflated {
        return Err(PageError::malformed(
            TokenFault::Compression,
            format!("inflated token exceeds {max_inflated} bytes"),
        ));
    }

    serde_json::from_slice(&inflated)
        .map_err(|e| PageError::malformed(TokenFault::Structure, e.to_string()))
}
