//! Core OTP computation: RFC 4226 (HOTP).
//!
//! HMAC over the big-endian moving factor, dynamic truncation, optional
//! Appendix A checksum digit, and the forward-only HOTP validation window.
//! The TOTP engine feeds its time-derived counter through the same path.

use crate::oath::types::*;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

/// Digit sums of `2 * n` for the Luhn-style checksum (RFC 4226 Appendix A).
const DOUBLE_DIGITS: [u32; 10] = [0, 2, 4, 6, 8, 1, 3, 5, 7, 9];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HMAC & truncation (RFC 4226 §5.3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute HMAC(key, message) using the specified algorithm.
pub(crate) fn compute_hmac(key: &[u8], data: &[u8], algo: Algorithm) -> OathResult<Vec<u8>> {
    let bad_key = |e: hmac::digest::InvalidLength| {
        OathError::new(OathErrorKind::Crypto, "HMAC key rejected").with_detail(e.to_string())
    };
    let digest = match algo {
        Algorithm::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(bad_key)?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(bad_key)?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(key).map_err(bad_key)?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
    };
    Ok(digest)
}

/// Extract the 31-bit dynamic binary code from a digest.
///
/// An explicit `truncation_offset` is honoured only while four bytes remain
/// after it; anything else falls back to the low nibble of the last byte.
fn dynamic_binary_code(digest: &[u8], truncation_offset: Option<usize>) -> u32 {
    let last = digest.len() - 1;
    let offset = match truncation_offset {
        Some(o) if o < digest.len() - 4 => o,
        Some(o) => {
            log::warn!("truncation offset {} out of range, using dynamic offset", o);
            (digest[last] & 0x0f) as usize
        }
        None => (digest[last] & 0x0f) as usize,
    };
    u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ])
}

/// Truncate an HMAC digest to a zero-padded decimal code of `digits` length.
pub fn truncate(digest: &[u8], digits: u32, truncation_offset: Option<usize>) -> OathResult<String> {
    check_digits(digits)?;
    if digest.len() < 20 {
        return Err(OathError::new(
            OathErrorKind::Crypto,
            format!("Digest too short for truncation: {} bytes", digest.len()),
        ));
    }
    let code = dynamic_binary_code(digest, truncation_offset) % 10u32.pow(digits);
    Ok(format!("{:0>width$}", code, width = digits as usize))
}

/// Checksum digit over the low `digits` decimal digits of `num`
/// (RFC 4226 Appendix A, `calcChecksum`).
pub fn checksum_digit(mut num: u64, digits: u32) -> u32 {
    let mut double = true;
    let mut total = 0;
    for _ in 0..digits {
        let mut digit = (num % 10) as u32;
        num /= 10;
        if double {
            digit = DOUBLE_DIGITS[digit as usize];
        }
        total += digit;
        double = !double;
    }
    match total % 10 {
        0 => 0,
        r => 10 - r,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OTP from an explicit counter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute the OTP for `counter`, the shared step behind HOTP and TOTP.
pub(crate) fn otp_at(
    key: &[u8],
    counter: u64,
    digits: u32,
    algo: Algorithm,
    add_checksum: bool,
    truncation_offset: Option<usize>,
) -> OathResult<String> {
    check_digits(digits)?;
    let digest = compute_hmac(key, &counter.to_be_bytes(), algo)?;
    let code = truncate(&digest, digits, truncation_offset)?;
    if !add_checksum {
        return Ok(code);
    }
    let value: u64 = code.parse().map_err(|_| {
        OathError::new(OathErrorKind::Crypto, "Truncated code is not numeric")
    })?;
    Ok(format!("{}{}", code, checksum_digit(value, digits)))
}

/// Walk `candidates` in order and return the first counter whose OTP
/// equals `otp`.
pub(crate) fn find_counter(
    key: &[u8],
    otp: &str,
    digits: u32,
    algo: Algorithm,
    candidates: impl IntoIterator<Item = u64>,
) -> OathResult<Option<u64>> {
    for counter in candidates {
        let generated = otp_at(key, counter, digits, algo, false, None)?;
        if constant_time_eq(generated.as_bytes(), otp.as_bytes()) {
            return Ok(Some(counter));
        }
    }
    Ok(None)
}

/// Check a candidate OTP's shape and return its digit count.
pub(crate) fn otp_digits(otp: &str) -> OathResult<u32> {
    let digits = u32::try_from(otp.len()).map_err(|_| OathError::invalid_otp())?;
    check_digits(digits)?;
    if !otp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OathError::new(OathErrorKind::InvalidOtp, "OTP must be numeric"));
    }
    Ok(digits)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HOTP (counter-based, RFC 4226)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate an HMAC-SHA1 HOTP value.
///
/// `add_checksum` appends the Appendix A checksum digit, so the result is
/// `digits + 1` characters long. `truncation_offset` overrides dynamic
/// truncation when it is in range and is ignored otherwise.
pub fn hotp_generate(
    secret: &[u8],
    counter: u64,
    digits: u32,
    add_checksum: bool,
    truncation_offset: Option<usize>,
) -> OathResult<String> {
    otp_at(secret, counter, digits, Algorithm::Sha1, add_checksum, truncation_offset)
}

/// Validate an HMAC-SHA1 HOTP value against `start_counter..=start_counter + window`.
///
/// The digit count is taken from `otp`. Returns the offset of the first
/// matching counter.
pub fn hotp_validate(secret: &[u8], start_counter: u64, window: u32, otp: &str) -> OathResult<OtpPosition> {
    let digits = otp_digits(otp)?;
    validate_counter(secret, start_counter, window, otp, digits, Algorithm::Sha1)
}

fn validate_counter(
    key: &[u8],
    start_counter: u64,
    window: u32,
    otp: &str,
    digits: u32,
    algo: Algorithm,
) -> OathResult<OtpPosition> {
    let end = start_counter.checked_add(window as u64).ok_or_else(|| {
        OathError::new(OathErrorKind::InvalidCounter, "Counter window overflows")
            .with_detail(format!("start {} + window {}", start_counter, window))
    })?;
    log::trace!("hotp: scanning counters {}..={}", start_counter, end);

    match find_counter(key, otp, digits, algo, start_counter..=end)? {
        Some(counter) => {
            let relative = counter - start_counter;
            log::debug!("hotp: match at relative offset {}", relative);
            Ok(OtpPosition::Counter { relative })
        }
        None => {
            log::debug!("hotp: no match in window of {}", window);
            Err(OathError::invalid_otp())
        }
    }
}

/// HOTP parameters: digit count and HMAC algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotp {
    pub digits: u32,
    pub algorithm: Algorithm,
}

impl Hotp {
    /// HMAC-SHA1 HOTP with `digits` digits.
    pub fn new(digits: u32) -> OathResult<Self> {
        check_digits(digits)?;
        Ok(Self {
            digits,
            algorithm: Algorithm::Sha1,
        })
    }

    /// Builder: set algorithm.
    pub fn with_algorithm(mut self, algo: Algorithm) -> Self {
        self.algorithm = algo;
        self
    }

    /// OTP for `counter`.
    pub fn generate(&self, secret: &[u8], counter: u64) -> OathResult<String> {
        otp_at(secret, counter, self.digits, self.algorithm, false, None)
    }

    /// Validate `otp` in `counter..=counter + window`.
    pub fn verify(&self, secret: &[u8], otp: &str, counter: u64, window: u32) -> OathResult<OtpPosition> {
        if otp.len() != self.digits as usize {
            return Err(OathError::new(
                OathErrorKind::InvalidOtp,
                format!("OTP must be {} digits", self.digits),
            ));
        }
        otp_digits(otp)?;
        validate_counter(secret, counter, window, otp, self.digits, self.algorithm)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Utility helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Constant-time comparison (to prevent timing attacks on code verification).
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC4226_SECRET: &[u8] = b"12345678901234567890";

    #[test]
    fn each_input_changes_the_code() {
        let base = hotp_generate(RFC4226_SECRET, 0, 6, false, None).unwrap();
        assert_eq!(base, "755224");
        // secret only
        let other_secret = hotp_generate(b"12345678901234567891", 0, 6, false, None).unwrap();
        assert_ne!(other_secret, base);
        // counter only
        assert_ne!(hotp_generate(RFC4226_SECRET, 1, 6, false, None).unwrap(), base);
        // digits only
        let eight = hotp_generate(RFC4226_SECRET, 0, 8, false, None).unwrap();
        assert_eq!(eight, "84755224");
        assert_ne!(eight, base);
        assert_ne!(hotp_generate(RFC4226_SECRET, 0, 7, false, None).unwrap(), base);
    }

    #[test]
    fn hmac_digest_lengths() {
        for algo in [Algorithm::Sha1, Algorithm::Sha256, Algorithm::Sha512] {
            let digest = compute_hmac(RFC4226_SECRET, &0u64.to_be_bytes(), algo).unwrap();
            assert_eq!(digest.len(), algo.digest_len());
        }
    }

    // ── RFC 4226 test vectors (Appendix D) ───────────────────────

    #[test]
    fn rfc4226_hotp_vectors() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314",
            "254676", "287922", "162583", "399871", "520489",
        ];
        for (counter, exp) in expected.iter().enumerate() {
            let code = hotp_generate(RFC4226_SECRET, counter as u64, 6, false, None).unwrap();
            assert_eq!(&code, exp, "HOTP mismatch at counter {}", counter);
        }
    }

    #[test]
    fn single_byte_secret_large_counter() {
        let code = hotp_generate(b"\x00", 1099511627776, 6, false, None).unwrap();
        assert_eq!(code, "363425");
    }

    // ── Truncation (RFC 4226 §5.4) ───────────────────────────────

    const SECTION_5_4_DIGEST: [u8; 20] = [
        0x1f, 0x86, 0x98, 0x69, 0x0e, 0x02, 0xca, 0x16, 0x61, 0x85, 0x50, 0xef, 0x7f, 0x19,
        0xda, 0x8e, 0x94, 0x5b, 0x55, 0x5a,
    ];

    #[test]
    fn truncate_section_5_4() {
        assert_eq!(truncate(&SECTION_5_4_DIGEST, 6, None).unwrap(), "872921");
        assert_eq!(truncate(&SECTION_5_4_DIGEST, 8, None).unwrap(), "57872921");
    }

    #[test]
    fn truncate_fixed_offsets() {
        assert_eq!(truncate(&SECTION_5_4_DIGEST, 6, Some(0)).unwrap(), "914537");
        assert_eq!(truncate(&SECTION_5_4_DIGEST, 6, Some(3)).unwrap(), "525898");
        assert_eq!(truncate(&SECTION_5_4_DIGEST, 6, Some(15)).unwrap(), "603733");
    }

    #[test]
    fn truncate_out_of_range_offset_falls_back() {
        assert_eq!(truncate(&SECTION_5_4_DIGEST, 6, Some(16)).unwrap(), "872921");
        assert_eq!(truncate(&SECTION_5_4_DIGEST, 6, Some(usize::MAX)).unwrap(), "872921");
    }

    #[test]
    fn truncate_short_digest() {
        let err = truncate(&[0u8; 19], 6, None).unwrap_err();
        assert_eq!(err.kind, OathErrorKind::Crypto);
        assert_eq!(truncate(&[0u8; 20], 6, None).unwrap(), "000000");
    }

    #[test]
    fn hotp_truncation_offset() {
        assert_eq!(hotp_generate(RFC4226_SECRET, 0, 6, false, Some(15)).unwrap(), "752228");
        assert_eq!(hotp_generate(RFC4226_SECRET, 0, 6, false, Some(99)).unwrap(), "755224");
    }

    // ── Checksum (RFC 4226 Appendix A) ───────────────────────────

    #[test]
    fn checksum_digit_values() {
        assert_eq!(checksum_digit(755224, 6), 3);
        assert_eq!(checksum_digit(0, 6), 0);
    }

    #[test]
    fn hotp_with_checksum() {
        let code = hotp_generate(RFC4226_SECRET, 0, 6, true, None).unwrap();
        assert_eq!(code, "7552243");
    }

    // ── Digits ───────────────────────────────────────────────────

    #[test]
    fn hotp_rejects_bad_digits() {
        for digits in [0, 1, 5, 9, 10, 20] {
            let err = hotp_generate(RFC4226_SECRET, 0, digits, false, None).unwrap_err();
            assert_eq!(err.kind, OathErrorKind::InvalidDigits, "digits {}", digits);
        }
        assert!(hotp_generate(RFC4226_SECRET, 0, 6, false, None).is_ok());
        assert!(hotp_generate(RFC4226_SECRET, 0, 8, false, None).is_ok());
    }

    // ── Validation ───────────────────────────────────────────────

    #[test]
    fn hotp_validate_within_window() {
        let otp = hotp_generate(b"TestCase secret", 13, 6, false, None).unwrap();
        let pos = hotp_validate(b"TestCase secret", 12, 2, &otp).unwrap();
        assert_eq!(pos, OtpPosition::Counter { relative: 1 });
        assert_eq!(pos.absolute(), None);
    }

    #[test]
    fn hotp_validate_outside_window() {
        let otp = hotp_generate(b"TestCase secret", 13, 6, false, None).unwrap();
        let err = hotp_validate(b"TestCase secret", 12, 0, &otp).unwrap_err();
        assert_eq!(err.kind, OathErrorKind::InvalidOtp);
    }

    #[test]
    fn hotp_validate_window_overflow() {
        let err = hotp_validate(RFC4226_SECRET, u64::MAX, 1, "755224").unwrap_err();
        assert_eq!(err.kind, OathErrorKind::InvalidCounter);
    }

    #[test]
    fn hotp_validate_at_counter_max() {
        let otp = hotp_generate(RFC4226_SECRET, u64::MAX, 6, false, None).unwrap();
        let pos = hotp_validate(RFC4226_SECRET, u64::MAX, 0, &otp).unwrap();
        assert_eq!(pos.relative(), 0);
    }

    #[test]
    fn hotp_validate_bad_shapes() {
        assert_eq!(
            hotp_validate(RFC4226_SECRET, 0, 5, "12345").unwrap_err().kind,
            OathErrorKind::InvalidDigits
        );
        assert_eq!(
            hotp_validate(RFC4226_SECRET, 0, 5, "75522a").unwrap_err().kind,
            OathErrorKind::InvalidOtp
        );
    }

    // ── Hotp parameters ──────────────────────────────────────────

    #[test]
    fn hotp_struct_generate_verify() {
        let hotp = Hotp::new(8).unwrap();
        assert_eq!(hotp.generate(RFC4226_SECRET, 1).unwrap(), "94287082");
        let pos = hotp.verify(RFC4226_SECRET, "94287082", 0, 3).unwrap();
        assert_eq!(pos.relative(), 1);
        assert!(hotp.verify(RFC4226_SECRET, "287082", 0, 3).is_err());
    }

    #[test]
    fn hotp_struct_rejects_bad_digits() {
        assert!(Hotp::new(5).is_err());
        assert!(Hotp::new(9).is_err());
    }

    #[test]
    fn hotp_algorithms_differ() {
        let sha1 = Hotp::new(8).unwrap();
        let sha256 = sha1.with_algorithm(Algorithm::Sha256);
        assert_ne!(
            sha1.generate(RFC4226_SECRET, 7).unwrap(),
            sha256.generate(RFC4226_SECRET, 7).unwrap()
        );
    }

    // ── constant_time_eq ─────────────────────────────────────────

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
