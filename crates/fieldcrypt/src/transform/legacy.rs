//! Inspection rules for stored values that may predate encryption.
//!
//! Ciphertext carries no marker, so a stored string is classified by shape:
//! numeric fields accept anything that parses as a finite number and contains
//! no `=`; string fields are treated as ciphertext only when they look like a
//! base64 blob of at least [`MIN_CIPHERTEXT_LEN`] characters. A long plaintext
//! note drawn only from the base64 alphabet is misclassified as ciphertext.

use serde_json::Number;

/// Shortest string considered a candidate ciphertext.
pub const MIN_CIPHERTEXT_LEN: usize = 20;

/// Return `true` if `value` has the shape of a padded standard-base64 blob.
pub fn looks_encrypted(value: &str) -> bool {
    if value.len() < MIN_CIPHERTEXT_LEN {
        return false;
    }
    let body = value.trim_end_matches('=');
    value.len() - body.len() <= 2
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// Return `true` if a stored numeric-field value is a legacy plaintext number.
pub fn is_plain_number(value: &str) -> bool {
    !value.contains('=') && parse_number(value).is_some()
}

/// Parse a stored or decrypted string into a finite JSON number.
///
/// Surrounding whitespace is ignored and a blank string reads as `0`, matching
/// how the application historically coerced form input. Integral values come
/// back as JSON integers however they were written (`"+5"`, `"1e3"`, `"2.0"`);
/// anything else becomes a float.
pub fn parse_number(value: &str) -> Option<Number> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(Number::from(0));
    }
    if let Ok(n) = trimmed.parse::<Number>() {
        if !n.is_f64() {
            return Some(n);
        }
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(integral_or_float)
}

/// Largest magnitude at which every integer is exactly representable as `f64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn integral_or_float(f: f64) -> Option<Number> {
    if f.fract() == 0.0 && f.abs() <= MAX_EXACT_INTEGER {
        // `-0.0` casts to `0`.
        Some(Number::from(f as i64))
    } else {
        Number::from_f64(f)
    }
}
