//! Shared-secret handling: random generation, hex and Base32 export.
//!
//! A `Secret` never prints its bytes through `Debug`; the only ways out are
//! the explicit `to_hex` / `to_base32` exports. The bytes are wiped on drop.

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroize;

use crate::oath::base32;
use crate::oath::core::{compute_hmac, constant_time_eq};
use crate::oath::types::*;

/// Default secret size in bytes for freshly provisioned devices.
pub const DEFAULT_SECRET_SIZE: usize = 40;
/// Minimum secret size recommended by RFC 4226 §4 (R6).
pub const RECOMMENDED_SECRET_SIZE: usize = 20;

/// HMAC key for `generate_secret_key`.
const SEED_KEY: &[u8] = b"oath-toolkit secret seed";

/// Raw shared secret bytes.
#[derive(Clone)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Wrap raw bytes. Empty secrets are rejected.
    pub fn new(bytes: impl Into<Vec<u8>>) -> OathResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(OathError::new(OathErrorKind::Crypto, "Secret must not be empty"));
        }
        Ok(Self(bytes))
    }

    /// Generate `len` bytes from the thread-local CSPRNG (at least one byte).
    pub fn random(len: usize) -> Self {
        let mut buf = vec![0u8; len.max(1)];
        rand::thread_rng().fill_bytes(&mut buf);
        Self(buf)
    }

    /// Parse a hex-encoded secret.
    pub fn from_hex(hex_str: &str) -> OathResult<Self> {
        let bytes = hex::decode(hex_str.trim()).map_err(|e| {
            OathError::new(OathErrorKind::InvalidHex, "Invalid hex secret").with_detail(e.to_string())
        })?;
        Self::new(bytes).map_err(|_| OathError::new(OathErrorKind::InvalidHex, "Empty hex secret"))
    }

    /// Parse a Base32 secret (spaces, lowercase and missing padding allowed).
    pub fn from_base32(b32: &str) -> OathResult<Self> {
        Self::new(base32::decode(b32)?)
    }

    /// Lowercase hex export.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Base32 export, optionally grouped for humans.
    pub fn to_base32(&self, human_readable: bool) -> String {
        base32::encode(&self.0, human_readable)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`: construction rejects empty secrets.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the secret meets the RFC 4226 size recommendation.
    pub fn is_recommended_size(&self) -> bool {
        self.0.len() >= RECOMMENDED_SECRET_SIZE
    }
}

impl AsRef<[u8]> for Secret {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.0, &other.0)
    }
}

impl Eq for Secret {}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<{} bytes>)", self.0.len())
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Secret::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Derive a Base32 secret from a seed string.
///
/// HMAC-SHA1 of `seed` under a fixed library key. This is for demos and
/// tests that need a stable secret per seed; it is not a key-derivation
/// function and the result is only as unpredictable as the seed. Production
/// secrets should come from [`Secret::random`].
pub fn generate_secret_key(seed: &[u8]) -> OathResult<String> {
    let digest = compute_hmac(SEED_KEY, seed, Algorithm::Sha1)?;
    Ok(base32::encode(&digest, false))
}
