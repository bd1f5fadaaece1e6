//! Core types shared by the HOTP and TOTP engines.

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Defaults & limits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Smallest supported OTP length (RFC 4226 §5.3).
pub const MIN_DIGITS: u32 = 6;
/// Largest supported OTP length.
pub const MAX_DIGITS: u32 = 8;
/// Default TOTP time step, in seconds.
pub const DEFAULT_TIME_STEP_SIZE: u32 = 30;
/// Default UNIX time at which TOTP starts counting steps.
pub const DEFAULT_START_OFFSET: i64 = 0;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Algorithm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// HMAC hash function used to derive the OTP digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri_name())
    }
}

impl Algorithm {
    /// Parse from a case-insensitive string.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SHA1" | "SHA-1" | "HMACSHA1" | "HMAC-SHA1" => Some(Self::Sha1),
            "SHA256" | "SHA-256" | "HMACSHA256" | "HMAC-SHA256" => Some(Self::Sha256),
            "SHA512" | "SHA-512" | "HMACSHA512" | "HMAC-SHA512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Name used in `otpauth://` parameters.
    pub fn uri_name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }

    /// Digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OTP kind
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Counter-based or time-based OTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpKind {
    Totp,
    Hotp,
}

impl fmt::Display for OtpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Totp => write!(f, "totp"),
            Self::Hotp => write!(f, "hotp"),
        }
    }
}

impl OtpKind {
    /// Parse `"totp"` / `"hotp"` (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "totp" => Some(Self::Totp),
            "hotp" => Some(Self::Hotp),
            _ => None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Validation position
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where in the search window a validated OTP was found.
///
/// HOTP has no absolute frame worth reporting: the caller already owns the
/// counter, and advances it by `relative + 1`. TOTP reports both the matching
/// time step and its signed distance from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OtpPosition {
    /// Matched `relative` counters after the start counter.
    Counter { relative: u64 },
    /// Matched time step `absolute`, `relative` steps from the current one.
    TimeStep { absolute: u64, relative: i64 },
}

impl OtpPosition {
    /// The matching time step, for TOTP matches.
    pub fn absolute(&self) -> Option<u64> {
        match self {
            Self::Counter { .. } => None,
            Self::TimeStep { absolute, .. } => Some(*absolute),
        }
    }

    /// Signed offset of the match; `0` is the counter/step the caller asked about.
    pub fn relative(&self) -> i64 {
        match self {
            Self::Counter { relative } => i64::try_from(*relative).unwrap_or(i64::MAX),
            Self::TimeStep { relative, .. } => *relative,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OathErrorKind {
    Crypto,
    InvalidDigits,
    InvalidHex,
    InvalidOtp,
    InvalidCounter,
    InvalidTimestamp,
    InvalidBase32,
    InvalidUri,
    InvalidConfig,
}

impl OathErrorKind {
    /// liboath return code for this kind, where one exists.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Crypto => Some(-1),
            Self::InvalidDigits => Some(-2),
            Self::InvalidHex => Some(-4),
            Self::InvalidOtp => Some(-6),
            Self::InvalidCounter => Some(-9),
            Self::InvalidTimestamp => Some(-10),
            Self::InvalidBase32 => Some(-20),
            Self::InvalidUri | Self::InvalidConfig => None,
        }
    }
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OathError {
    pub kind: OathErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for OathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for OathError {}

impl OathError {
    pub fn new(kind: OathErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// liboath-style numeric code.
    pub fn code(&self) -> Option<i32> {
        self.kind.code()
    }

    pub(crate) fn invalid_digits(digits: u32) -> Self {
        Self::new(
            OathErrorKind::InvalidDigits,
            format!("Unsupported number of digits: {}", digits),
        )
        .with_detail(format!("expected {}..={}", MIN_DIGITS, MAX_DIGITS))
    }

    pub(crate) fn invalid_otp() -> Self {
        Self::new(OathErrorKind::InvalidOtp, "OTP not found in window")
    }
}

impl From<OathError> for String {
    fn from(e: OathError) -> String {
        e.to_string()
    }
}

/// Crate result alias.
pub type OathResult<T> = Result<T, OathError>;

/// Reject digit counts outside `MIN_DIGITS..=MAX_DIGITS`.
pub(crate) fn check_digits(digits: u32) -> OathResult<()> {
    if (MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
        Ok(())
    } else {
        Err(OathError::invalid_digits(digits))
    }
}
