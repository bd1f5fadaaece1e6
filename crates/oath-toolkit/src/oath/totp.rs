//! Time-based OTP (RFC 6238).
//!
//! The moving factor is the number of whole time steps elapsed since
//! `start_offset`; everything after that is plain HOTP. Validation checks a
//! symmetric window of steps around the current one, earliest step first.

use crate::oath::core::{find_counter, otp_at, otp_digits};
use crate::oath::types::*;
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Time-step helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Resolve an optional step size; `None` and `0` both mean the default.
pub fn effective_step(time_step_size: Option<u32>) -> u32 {
    match time_step_size {
        Some(step) if step > 0 => step,
        _ => DEFAULT_TIME_STEP_SIZE,
    }
}

/// Compute `T = floor((now - start_offset) / step)`.
pub fn time_step(now: i64, time_step_size: Option<u32>, start_offset: i64) -> OathResult<u64> {
    let elapsed = now
        .checked_sub(start_offset)
        .filter(|e| *e >= 0)
        .ok_or_else(|| {
            OathError::new(OathErrorKind::InvalidTimestamp, "Time is before the start offset")
                .with_detail(format!("now {} < start offset {}", now, start_offset))
        })?;
    Ok(elapsed as u64 / effective_step(time_step_size) as u64)
}

/// Seconds remaining until the step containing `now` expires.
pub fn seconds_remaining_at(now: i64, time_step_size: Option<u32>, start_offset: i64) -> OathResult<u32> {
    let step = effective_step(time_step_size) as i64;
    let elapsed = now.checked_sub(start_offset).filter(|e| *e >= 0).ok_or_else(|| {
        OathError::new(OathErrorKind::InvalidTimestamp, "Time is before the start offset")
    })?;
    Ok((step - elapsed % step) as u32)
}

/// Current unix timestamp in seconds.
pub fn current_unix_time() -> i64 {
    chrono::Utc::now().timestamp()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOTP (HMAC-SHA1)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate an HMAC-SHA1 TOTP value at `now`.
pub fn totp_generate(
    secret: &[u8],
    now: i64,
    time_step_size: Option<u32>,
    start_offset: i64,
    digits: u32,
) -> OathResult<String> {
    let t = time_step(now, time_step_size, start_offset)?;
    otp_at(secret, t, digits, Algorithm::Sha1, false, None)
}

/// Validate an HMAC-SHA1 TOTP value within `window` steps either side of `now`.
///
/// The digit count is taken from `otp`.
pub fn totp_validate(
    secret: &[u8],
    now: i64,
    time_step_size: Option<u32>,
    start_offset: i64,
    window: u32,
    otp: &str,
) -> OathResult<OtpPosition> {
    let digits = otp_digits(otp)?;
    validate_steps(
        secret,
        now,
        time_step_size,
        start_offset,
        window,
        otp,
        digits,
        Algorithm::Sha1,
    )
}

#[allow(clippy::too_many_arguments)]
fn validate_steps(
    key: &[u8],
    now: i64,
    time_step_size: Option<u32>,
    start_offset: i64,
    window: u32,
    otp: &str,
    digits: u32,
    algo: Algorithm,
) -> OathResult<OtpPosition> {
    let t = time_step(now, time_step_size, start_offset)?;
    // steps before zero do not exist
    let first = t.saturating_sub(window as u64);
    // no i64 timestamp reaches a step past i64::MAX
    let last = t.saturating_add(window as u64).min(i64::MAX as u64);
    log::trace!("totp: scanning steps {}..={} around {}", first, last, t);

    match find_counter(key, otp, digits, algo, first..=last)? {
        Some(absolute) => {
            let relative = absolute as i64 - t as i64;
            log::debug!("totp: match at step {} (relative {})", absolute, relative);
            Ok(OtpPosition::TimeStep { absolute, relative })
        }
        None => {
            log::debug!("totp: no match within {} steps of {}", window, t);
            Err(OathError::invalid_otp())
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOTP parameters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// TOTP parameters: digits, step size, start offset and HMAC algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totp {
    pub digits: u32,
    pub time_step_size: u32,
    pub start_offset: i64,
    pub algorithm: Algorithm,
}

impl Totp {
    /// HMAC-SHA1 TOTP with the default 30 s step from the epoch.
    pub fn new(digits: u32) -> OathResult<Self> {
        check_digits(digits)?;
        Ok(Self {
            digits,
            time_step_size: DEFAULT_TIME_STEP_SIZE,
            start_offset: DEFAULT_START_OFFSET,
            algorithm: Algorithm::Sha1,
        })
    }

    /// Builder: set step size (`0` keeps the default).
    pub fn with_time_step_size(mut self, step: u32) -> Self {
        self.time_step_size = effective_step(Some(step));
        self
    }

    /// Builder: set start offset.
    pub fn with_start_offset(mut self, start_offset: i64) -> Self {
        self.start_offset = start_offset;
        self
    }

    /// Builder: set algorithm.
    pub fn with_algorithm(mut self, algo: Algorithm) -> Self {
        self.algorithm = algo;
        self
    }

    /// Time step containing `now`.
    pub fn step_at(&self, now: i64) -> OathResult<u64> {
        time_step(now, Some(self.time_step_size), self.start_offset)
    }

    /// OTP at an explicit unix timestamp.
    pub fn generate_at(&self, secret: &[u8], now: i64) -> OathResult<String> {
        let t = self.step_at(now)?;
        otp_at(secret, t, self.digits, self.algorithm, false, None)
    }

    /// OTP at the current time.
    pub fn generate_now(&self, secret: &[u8]) -> OathResult<String> {
        self.generate_at(secret, current_unix_time())
    }

    /// Validate `otp` within `window` steps of `now`.
    pub fn verify_at(&self, secret: &[u8], otp: &str, now: i64, window: u32) -> OathResult<OtpPosition> {
        if otp.len() != self.digits as usize {
            return Err(OathError::new(
                OathErrorKind::InvalidOtp,
                format!("OTP must be {} digits", self.digits),
            ));
        }
        otp_digits(otp)?;
        validate_steps(
            secret,
            now,
            Some(self.time_step_size),
            self.start_offset,
            window,
            otp,
            self.digits,
            self.algorithm,
        )
    }

    /// Validate `otp` against the current time.
    pub fn verify_now(&self, secret: &[u8], otp: &str, window: u32) -> OathResult<OtpPosition> {
        self.verify_at(secret, otp, current_unix_time(), window)
    }
}
