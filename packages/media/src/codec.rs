//! Transport encoding for file payloads.
//!
//! File bytes travel over the JSON API as standard base64 text. Decoding is
//! strict: non-alphabet characters and incorrect padding are rejected rather
//! than skipped. No size limit is enforced here; that is the ingestion
//! layer's job.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::CodecError;

/// Decode a base64 payload into raw bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    Ok(STANDARD.decode(text)?)
}

/// Encode raw bytes as base64 text. Total; the inverse of [`decode`].
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
