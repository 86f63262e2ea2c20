//! Base64 decoding tolerant of the padding Gmail sends (or doesn't)

use base64::alphabet;
use base64::engine::{DecodePaddingMode, Engine, GeneralPurpose, GeneralPurposeConfig};

use super::ExtractError;

const PADDING_INDIFFERENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, PADDING_INDIFFERENT);

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, PADDING_INDIFFERENT);

/// Drop every trailing `=`: missing and surplus padding decode the same
fn strip_padding(data: &str) -> &str {
    data.trim_end().trim_end_matches('=')
}

/// Decode an attachment body (URL-safe alphabet)
pub fn decode_attachment(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_LENIENT.decode(strip_padding(data))
}

/// Decode a text body to UTF-8.
///
/// Uses the standard alphabet. Gmail encodes bodies with the URL-safe
/// alphabet, so a body with `-` or `_` falls back to it.
pub fn decode_plain_text(data: &str) -> Result<String, ExtractError> {
    let data = strip_padding(data);
    let bytes = match STANDARD_LENIENT.decode(data) {
        Ok(bytes) => bytes,
        Err(standard_err) => URL_SAFE_LENIENT.decode(data).map_err(|_| standard_err)?,
    };
    Ok(String::from_utf8(bytes)?)
}
