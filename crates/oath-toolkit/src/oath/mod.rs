//! OATH crate: sub-modules.

pub mod types;
pub mod base32;
pub mod core;
pub mod totp;
pub mod secret;
pub mod uri;
pub mod config;
pub mod device;

// Re-export top-level items for convenience.
pub use types::*;
pub use self::base32::{decode as base32_decode, encode as base32_encode};
pub use self::core::{checksum_digit, hotp_generate, hotp_validate, truncate, Hotp};
pub use totp::{current_unix_time, time_step, totp_generate, totp_validate, Totp};
pub use secret::{generate_secret_key, Secret};
pub use uri::{build_otpauth_uri, parse_otpauth_uri, ProvisioningUri};
pub use config::OathConfig;
pub use device::{normalize_token, HotpDevice, TotpDevice};
