//! # OATH Toolkit – HOTP / TOTP one-time passwords
//!
//! Counter-based and time-based one-time passwords as used by hardware
//! tokens and authenticator apps:
//!
//! - **RFC 4226 / 6238** – HOTP & TOTP generation and window validation,
//!   HMAC-SHA1 by default with SHA-256 / SHA-512 available
//! - **Base32** – Tolerant decoder for user-entered secrets, grouped encoder
//! - **Secrets** – Random generation, hex / Base32 export, redacted `Debug`
//! - **otpauth:// URIs** – Provisioning URI generation & parsing
//! - **Devices** – Serialisable HOTP / TOTP devices with replay protection
//!   and JSON-backed configuration

pub mod oath;
