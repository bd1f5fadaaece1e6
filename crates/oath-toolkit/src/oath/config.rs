//! OTP settings a consuming application persists per device.

use serde::{Deserialize, Serialize};

use crate::oath::secret::DEFAULT_SECRET_SIZE;
use crate::oath::types::*;

/// Device defaults: digits, window, TOTP timing, algorithm, secret size.
///
/// Every field is optional in JSON; missing ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OathConfig {
    /// OTP length (6 to 8).
    pub digits: u32,
    /// Counters (HOTP) or steps either side (TOTP) accepted on verification.
    pub window: u32,
    /// TOTP step in seconds.
    pub time_step_size: u32,
    /// UNIX time at which TOTP steps start.
    pub start_offset: i64,
    pub algorithm: Algorithm,
    /// Bytes of randomness for newly provisioned secrets.
    pub secret_size: usize,
}

impl Default for OathConfig {
    fn default() -> Self {
        Self {
            digits: 6,
            window: 1,
            time_step_size: DEFAULT_TIME_STEP_SIZE,
            start_offset: DEFAULT_START_OFFSET,
            algorithm: Algorithm::Sha1,
            secret_size: DEFAULT_SECRET_SIZE,
        }
    }
}

impl OathConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> OathResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            OathError::new(OathErrorKind::InvalidConfig, "Invalid OATH config").with_detail(e.to_string())
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> OathResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            OathError::new(OathErrorKind::InvalidConfig, format!("JSON serialize: {}", e))
        })
    }

    /// Check the values are usable.
    pub fn validate(&self) -> OathResult<()> {
        check_digits(self.digits)?;
        if self.time_step_size == 0 {
            return Err(OathError::new(
                OathErrorKind::InvalidConfig,
                "timeStepSize must be positive",
            ));
        }
        if self.secret_size == 0 {
            return Err(OathError::new(
                OathErrorKind::InvalidConfig,
                "secretSize must be positive",
            ));
        }
        Ok(())
    }
}
