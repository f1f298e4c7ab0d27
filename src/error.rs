//! Error types for the audio conversion pipeline
//!
//! Every stage (transcoding, parsing, encoding) aborts the whole conversion
//! with a single `AudioError`. Callers that only want one generic
//! "audio generation failed" message can use `Display`; callers that need to
//! discriminate can match on the variant or use [`AudioError::code`].

use thiserror::Error;

/// Failure kinds of the conversion pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// Buffer too short to contain a claimed header.
    #[error("Truncated input: {0}")]
    TruncatedInput(String),

    /// Required chunk tags missing or out of order.
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// Valid container but unsupported bit depth or encoding.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Base64 text failed to decode.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// The MP3 frame encoder failed while building, encoding or flushing.
    #[error("Encoding failure: {0}")]
    EncodingFailure(String),
}

impl AudioError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TruncatedInput(_) => "truncated_input",
            Self::MalformedContainer(_) => "malformed_container",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::InvalidEncoding(_) => "invalid_encoding",
            Self::EncodingFailure(_) => "encoding_failure",
        }
    }
}

pub type Result<T> = std::result::Result<T, AudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            AudioError::TruncatedInput(String::new()),
            AudioError::MalformedContainer(String::new()),
            AudioError::UnsupportedFormat(String::new()),
            AudioError::InvalidEncoding(String::new()),
            AudioError::EncodingFailure(String::new()),
        ];
        let mut codes: Vec<_> = errors.iter().map(AudioError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn display_includes_detail() {
        let err = AudioError::UnsupportedFormat("8-bit samples".to_string());
        assert_eq!(err.to_string(), "Unsupported format: 8-bit samples");
    }
}
