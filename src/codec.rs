//! Reversible channel tokens.
//!
//! A token is the URL-safe base64 form of the channel id's ASCII decimal
//! string, with the trailing `=` padding removed. Decoding restores the
//! padding to the next multiple of four before running the base64 transform.
//!
//! ```text
//! -1001234567890  ->  "-1001234567890"  ->  "LTEwMDEyMzQ1Njc4OTA"
//! ```

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use std::num::ParseIntError;
use thiserror::Error;

/// URL-safe alphabet. Encoding never emits padding; decoding expects the
/// canonical padding that [`decode`] reconstructs.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

/// Errors from [`decode`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("token is not valid url-safe base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded token is not ascii")]
    NotAscii,
    #[error("decoded token is not a decimal integer: {0}")]
    NotInteger(#[from] ParseIntError),
}

/// Encode a channel id into its token.
pub fn encode(channel_id: i64) -> String {
    TOKEN_ENGINE.encode(channel_id.to_string())
}

/// Decode a token back into a channel id.
///
/// Trailing `=` characters on the input are ignored, so both padded and
/// unpadded forms of the same token decode to the same id.
pub fn decode(token: &str) -> Result<i64, DecodeError> {
    let trimmed = token.trim_end_matches('=');
    let pad = (4 - trimmed.len() % 4) % 4;

    let mut padded = String::with_capacity(trimmed.len() + pad);
    padded.push_str(trimmed);
    padded.extend(std::iter::repeat_n('=', pad));

    let bytes = TOKEN_ENGINE.decode(padded)?;
    if !bytes.is_ascii() {
        return Err(DecodeError::NotAscii);
    }
    // ASCII is always valid UTF-8.
    let text = String::from_utf8(bytes).map_err(|_| DecodeError::NotAscii)?;
    Ok(text.parse::<i64>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_channel_token() {
        let token = encode(-1001234567890);
        assert_eq!(token, "LTEwMDEyMzQ1Njc4OTA");
        assert_eq!(decode(&token).unwrap(), -1001234567890);
    }

    #[test]
    fn test_round_trip_edges() {
        for id in [0, 1, -1, 42, -100, i64::MAX, i64::MIN, -1002000000000] {
            let token = encode(id);
            assert!(!token.contains('='), "padding leaked into {token}");
            assert_eq!(decode(&token).unwrap(), id, "round trip failed for {id}");
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(encode(-1009876543210), encode(-1009876543210));
    }

    #[test]
    fn test_padded_input_accepted() {
        // "42" -> "NDI=" when padded
        assert_eq!(encode(42), "NDI");
        assert_eq!(decode("NDI=").unwrap(), 42);
        assert_eq!(decode("NDI").unwrap(), 42);
    }

    #[test]
    fn test_url_safe_alphabet() {
        for id in (-5000..5000).step_by(7) {
            let token = encode(id);
            assert!(
                token
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
                "unsafe character in {token}"
            );
        }
    }

    #[test]
    fn test_invalid_alphabet_rejected() {
        assert!(matches!(decode("ab+/"), Err(DecodeError::Base64(_))));
        assert!(matches!(decode("a!b"), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn test_impossible_length_rejected() {
        // One leftover character can never be valid base64.
        assert!(matches!(decode("NDIxM"), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn test_non_integer_payload_rejected() {
        let token = TOKEN_ENGINE.encode("hello");
        assert!(matches!(decode(&token), Err(DecodeError::NotInteger(_))));
    }

    #[test]
    fn test_overflowing_payload_rejected() {
        let token = TOKEN_ENGINE.encode("99999999999999999999999");
        assert!(matches!(decode(&token), Err(DecodeError::NotInteger(_))));
    }

    #[test]
    fn test_non_ascii_payload_rejected() {
        let token = TOKEN_ENGINE.encode([0xff, 0x31]);
        assert!(matches!(decode(&token), Err(DecodeError::NotAscii)));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(decode("").is_err());
    }
}
