//! RFC 4648 Base32 with a human-readable variant.
//!
//! Secrets shown to users are grouped in blocks of four (`MZXW 6`), and the
//! keys people paste back in are often lowercase, unpadded, or spaced. The
//! decoder accepts all of those as long as the input is unambiguous.

use crate::oath::types::*;

const ALPHABET: base32::Alphabet = base32::Alphabet::Rfc4648 { padding: true };
const GROUP: usize = 4;

/// Base32-encode `data`.
///
/// With `human_readable`, the output is split into space-separated groups of
/// four characters and trailing padding is dropped.
pub fn encode(data: &[u8], human_readable: bool) -> String {
    if data.is_empty() {
        return String::new();
    }
    let encoded = base32::encode(ALPHABET, data);
    if !human_readable {
        return encoded;
    }
    let grouped = encoded
        .as_bytes()
        .chunks(GROUP)
        .map(|c| String::from_utf8_lossy(c))
        .collect::<Vec<_>>()
        .join(" ");
    grouped.trim_end_matches(|c| c == '=' || c == ' ').to_string()
}

/// Decode Base32, tolerating spaces, missing padding and lowercase input.
pub fn decode(data: &str) -> OathResult<Vec<u8>> {
    if data.is_empty() {
        return Err(invalid("Invalid base32 string", "empty input"));
    }
    let has_upper = data.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = data.chars().any(|c| c.is_ascii_lowercase());
    if has_upper && has_lower {
        return Err(invalid(
            "Base32 string cannot be both upper- and lowercased",
            format!("{} characters", data.len()),
        ));
    }
    if let Some(bad) = data
        .chars()
        .find(|c| !matches!(c, 'A'..='Z' | 'a'..='z' | '2'..='7' | '=' | ' '))
    {
        return Err(invalid(
            "Invalid base32 string",
            format!("unexpected character {:?}", bad),
        ));
    }

    let cleaned: String = data
        .chars()
        .filter(|c| *c != ' ')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let body = cleaned.trim_end_matches('=');
    if body.is_empty() {
        return Err(invalid("Invalid base32 string", "no data"));
    }
    if body.contains('=') {
        return Err(invalid("Invalid base32 string", "padding inside data"));
    }
    // 1, 3 and 6 trailing characters cannot come from whole bytes
    if matches!(body.len() % 8, 1 | 3 | 6) {
        return Err(invalid(
            "Invalid base32 string",
            format!("impossible length {}", body.len()),
        ));
    }

    let padded = pad(body);
    if cleaned.len() > padded.len() {
        return Err(invalid("Invalid base32 string", "too much padding"));
    }
    base32::decode(ALPHABET, &padded).ok_or_else(|| invalid("Invalid base32 string", "decode failed"))
}

/// Decode Base32 given as raw bytes (must be ASCII).
pub fn decode_bytes(data: &[u8]) -> OathResult<Vec<u8>> {
    let text = std::str::from_utf8(data)
        .map_err(|e| invalid("Invalid base32 string", e.to_string()))?;
    decode(text)
}

/// Whether `data` would decode successfully.
pub fn is_valid(data: &str) -> bool {
    decode(data).is_ok()
}

/// Pad to a multiple of 8 with `=`.
fn pad(s: &str) -> String {
    let remainder = s.len() % 8;
    if remainder == 0 {
        s.to_string()
    } else {
        format!("{}{}", s, "=".repeat(8 - remainder))
    }
}

fn invalid(msg: &str, detail: impl Into<String>) -> OathError {
    OathError::new(OathErrorKind::InvalidBase32, msg).with_detail(detail)
}
