//! HOTP and TOTP devices: a secret plus the parameters to check tokens with.
//!
//! These are plain values. Storing them is up to the caller, which is why
//! they serialise (the secret as hex). A `HotpDevice` moves its own counter
//! past every accepted token so the same token cannot be accepted twice.

use serde::{Deserialize, Serialize};

use crate::oath::config::OathConfig;
use crate::oath::core::{otp_at, Hotp};
use crate::oath::secret::Secret;
use crate::oath::totp::{current_unix_time, Totp};
use crate::oath::types::*;
use crate::oath::uri::build_otpauth_uri;

/// Trim a user-entered token and restore leading zeros dropped by numeric input.
pub fn normalize_token(token: &str, digits: u32) -> OathResult<String> {
    let token = token.trim();
    if token.is_empty() {
        return Err(OathError::new(OathErrorKind::InvalidOtp, "OTP is required"));
    }
    let digits = digits as usize;
    if token.len() > digits || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OathError::new(
            OathErrorKind::InvalidOtp,
            format!("OTP must be {} digits", digits),
        ));
    }
    Ok(format!("{:0>width$}", token, width = digits))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HOTP device
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Counter-based device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotpDevice {
    pub secret: Secret,
    pub digits: u32,
    pub window: u32,
    /// Next expected counter.
    pub counter: u64,
    #[serde(default)]
    pub algorithm: Algorithm,
}

impl HotpDevice {
    /// Device for an existing secret, starting at counter 0.
    pub fn new(secret: Secret, config: &OathConfig) -> OathResult<Self> {
        config.validate()?;
        Ok(Self {
            secret,
            digits: config.digits,
            window: config.window,
            counter: 0,
            algorithm: config.algorithm,
        })
    }

    /// Device with a fresh random secret of `config.secret_size` bytes.
    pub fn provision(config: &OathConfig) -> OathResult<Self> {
        Self::new(Secret::random(config.secret_size), config)
    }

    /// Builder: set the starting counter.
    pub fn with_counter(mut self, counter: u64) -> Self {
        self.counter = counter;
        self
    }

    fn params(&self) -> OathResult<Hotp> {
        Ok(Hotp::new(self.digits)?.with_algorithm(self.algorithm))
    }

    /// Token for the current counter.
    pub fn current_token(&self) -> OathResult<String> {
        self.params()?.generate(self.secret.as_bytes(), self.counter)
    }

    /// Check `token` and, on success, move the counter past the match.
    pub fn verify_token(&mut self, token: &str) -> OathResult<OtpPosition> {
        let token = normalize_token(token, self.digits)?;
        let pos = self
            .params()?
            .verify(self.secret.as_bytes(), &token, self.counter, self.window)?;
        let advance = pos.relative() as u64 + 1;
        self.counter = self.counter.checked_add(advance).ok_or_else(|| {
            OathError::new(OathErrorKind::InvalidCounter, "Counter exhausted")
        })?;
        log::debug!("hotp device: counter advanced to {}", self.counter);
        Ok(pos)
    }

    /// Secret in grouped Base32, for manual entry.
    pub fn secret_base32(&self) -> String {
        self.secret.to_base32(true)
    }

    pub fn secret_hex(&self) -> String {
        self.secret.to_hex()
    }

    /// `otpauth://hotp/...` URI carrying the current counter.
    pub fn provisioning_uri(&self, user: &str, issuer: &str) -> OathResult<String> {
        build_otpauth_uri(OtpKind::Hotp, &self.secret, user, issuer, Some(self.counter))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOTP device
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Time-based device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotpDevice {
    pub secret: Secret,
    pub digits: u32,
    pub window: u32,
    pub time_step_size: u32,
    pub start_offset: i64,
    #[serde(default)]
    pub algorithm: Algorithm,
}

impl TotpDevice {
    pub fn new(secret: Secret, config: &OathConfig) -> OathResult<Self> {
        config.validate()?;
        Ok(Self {
            secret,
            digits: config.digits,
            window: config.window,
            time_step_size: config.time_step_size,
            start_offset: config.start_offset,
            algorithm: config.algorithm,
        })
    }

    /// Device with a fresh random secret of `config.secret_size` bytes.
    pub fn provision(config: &OathConfig) -> OathResult<Self> {
        Self::new(Secret::random(config.secret_size), config)
    }

    fn params(&self) -> OathResult<Totp> {
        Ok(Totp::new(self.digits)?
            .with_time_step_size(self.time_step_size)
            .with_start_offset(self.start_offset)
            .with_algorithm(self.algorithm))
    }

    /// Token valid at `now`.
    pub fn token_at(&self, now: i64) -> OathResult<String> {
        let step = self.params()?.step_at(now)?;
        otp_at(self.secret.as_bytes(), step, self.digits, self.algorithm, false, None)
    }

    /// Check `token` against `now`.
    pub fn verify_token_at(&self, token: &str, now: i64) -> OathResult<OtpPosition> {
        let token = normalize_token(token, self.digits)?;
        self.params()?
            .verify_at(self.secret.as_bytes(), &token, now, self.window)
    }

    /// Check `token` against the current time.
    pub fn verify_token(&self, token: &str) -> OathResult<OtpPosition> {
        self.verify_token_at(token, current_unix_time())
    }

    /// Secret in grouped Base32, for manual entry.
    pub fn secret_base32(&self) -> String {
        self.secret.to_base32(true)
    }

    pub fn secret_hex(&self) -> String {
        self.secret.to_hex()
    }

    /// `otpauth://totp/...` URI.
    pub fn provisioning_uri(&self, user: &str, issuer: &str) -> OathResult<String> {
        build_otpauth_uri(OtpKind::Totp, &self.secret, user, issuer, None)
    }
}
