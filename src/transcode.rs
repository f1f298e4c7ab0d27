//! Base64 <-> bytes, tolerant of data-URL prefixes and embedded whitespace

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{AudioError, Result};

const DATA_URL_SCHEME: &str = "data:";
const BASE64_MARKER: &str = "base64,";

/// Strip a leading `data:<anything>;base64,` prefix if present.
pub fn strip_data_url_prefix(text: &str) -> &str {
    if !text.starts_with(DATA_URL_SCHEME) {
        return text;
    }
    match text.find(BASE64_MARKER) {
        Some(index) => &text[index + BASE64_MARKER.len()..],
        None => text,
    }
}

/// Decode Base64 text into bytes.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let cleaned: String = strip_data_url_prefix(text)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    STANDARD.decode(cleaned.as_bytes()).map_err(|e| {
        log::debug!("Base64 decode failed: {}", e);
        AudioError::InvalidEncoding(e.to_string())
    })
}

/// Encode bytes as standard padded Base64, without any prefix.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Build a `data:` URL for the given MIME type.
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("{}{};{}{}", DATA_URL_SCHEME, mime, BASE64_MARKER, encode(bytes))
}
