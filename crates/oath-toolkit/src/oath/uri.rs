//! `otpauth://` provisioning URIs for authenticator apps.
//!
//! Format: `otpauth://{totp|hotp}/{issuer}:{user}?secret={base32}&issuer={issuer}[&counter={n}]`
//! (<https://github.com/google/google-authenticator/wiki/Key-Uri-Format>).
//!
//! QR generators and authenticator apps consume these byte for byte, so the
//! builder emits exactly that parameter order and escapes every field.

use crate::oath::secret::Secret;
use crate::oath::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build a provisioning URI.
///
/// `counter` is required for HOTP and must be absent for TOTP.
pub fn build_otpauth_uri(
    kind: OtpKind,
    secret: &Secret,
    user: &str,
    issuer: &str,
    counter: Option<u64>,
) -> OathResult<String> {
    let counter_param = match (kind, counter) {
        (OtpKind::Hotp, Some(c)) => format!("&counter={}", c),
        (OtpKind::Hotp, None) => {
            return Err(OathError::new(
                OathErrorKind::InvalidCounter,
                "HOTP URIs require an initial counter",
            ))
        }
        (OtpKind::Totp, None) => String::new(),
        (OtpKind::Totp, Some(_)) => {
            return Err(OathError::new(
                OathErrorKind::InvalidCounter,
                "TOTP URIs do not take a counter",
            ))
        }
    };
    let issuer = url_encode(issuer);
    Ok(format!(
        "otpauth://{}/{}:{}?secret={}&issuer={}{}",
        kind,
        issuer,
        url_encode(user),
        url_encode(&secret.to_base32(false)),
        issuer,
        counter_param
    ))
}

/// Build a provisioning URI straight from key bytes.
///
/// Returns `(base32_secret, uri)`.
pub fn generate(
    kind: OtpKind,
    key: &[u8],
    user: &str,
    issuer: &str,
    counter: Option<u64>,
) -> OathResult<(String, String)> {
    let secret = Secret::new(key.to_vec())?;
    let uri = build_otpauth_uri(kind, &secret, user, issuer, counter)?;
    Ok((secret.to_base32(false), uri))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Parse
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A parsed `otpauth://` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningUri {
    pub kind: OtpKind,
    pub issuer: Option<String>,
    pub user: String,
    pub secret: Secret,
    /// Initial counter (HOTP only).
    pub counter: Option<u64>,
    pub algorithm: Option<Algorithm>,
    pub digits: Option<u32>,
    pub period: Option<u32>,
}

impl ProvisioningUri {
    /// Re-emit in the canonical provisioning format.
    pub fn to_uri(&self) -> OathResult<String> {
        let issuer = self.issuer.as_deref().ok_or_else(|| {
            OathError::new(OathErrorKind::InvalidUri, "Provisioning URIs need an issuer")
        })?;
        build_otpauth_uri(self.kind, &self.secret, &self.user, issuer, self.counter)
    }
}

/// Parse an `otpauth://` URI.
pub fn parse_otpauth_uri(uri: &str) -> OathResult<ProvisioningUri> {
    let url = url::Url::parse(uri)
        .map_err(|e| OathError::new(OathErrorKind::InvalidUri, format!("Invalid URI: {}", e)))?;

    if url.scheme() != "otpauth" {
        return Err(OathError::new(
            OathErrorKind::InvalidUri,
            format!("Expected scheme 'otpauth', got '{}'", url.scheme()),
        ));
    }

    let kind = url
        .host_str()
        .and_then(OtpKind::from_str_loose)
        .ok_or_else(|| {
            OathError::new(
                OathErrorKind::InvalidUri,
                format!("Unknown OTP type: {:?}", url.host_str()),
            )
        })?;

    // Path is "/LABEL" or "/ISSUER:LABEL". Split before decoding: an
    // escaped ':' belongs to the issuer.
    let path = url.path();
    let path = path.strip_prefix('/').unwrap_or(path);
    let (path_issuer, user) = match path.split_once(':') {
        Some((issuer, user)) => (
            Some(url_decode(issuer).trim().to_string()),
            url_decode(user).trim().to_string(),
        ),
        None => (None, url_decode(path).trim().to_string()),
    };

    let mut secret = None;
    let mut param_issuer = None;
    let mut counter = None;
    let mut algorithm = None;
    let mut digits = None;
    let mut period = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "secret" => secret = Some(Secret::from_base32(&value)?),
            "issuer" => param_issuer = Some(value.to_string()),
            "counter" => {
                let c = value.parse::<u64>().map_err(|_| {
                    OathError::new(OathErrorKind::InvalidCounter, format!("Invalid counter: {}", value))
                })?;
                counter = Some(c);
            }
            "algorithm" => {
                let algo = Algorithm::from_str_loose(&value).ok_or_else(|| {
                    OathError::new(OathErrorKind::InvalidUri, format!("Unknown algorithm: {}", value))
                })?;
                algorithm = Some(algo);
            }
            "digits" => {
                let d = value.parse::<u32>().map_err(|_| {
                    OathError::new(OathErrorKind::InvalidDigits, format!("Invalid digits: {}", value))
                })?;
                check_digits(d)?;
                digits = Some(d);
            }
            "period" => {
                let p = value.parse::<u32>().ok().filter(|p| *p > 0).ok_or_else(|| {
                    OathError::new(OathErrorKind::InvalidUri, format!("Invalid period: {}", value))
                })?;
                period = Some(p);
            }
            other => log::debug!("otpauth: ignoring parameter {:?}", other),
        }
    }

    let secret = secret
        .ok_or_else(|| OathError::new(OathErrorKind::InvalidUri, "Missing 'secret' parameter"))?;

    match kind {
        OtpKind::Hotp if counter.is_none() => {
            return Err(OathError::new(
                OathErrorKind::InvalidCounter,
                "HOTP URIs require a 'counter' parameter",
            ))
        }
        OtpKind::Totp if counter.is_some() => {
            log::warn!("otpauth: ignoring counter on a TOTP URI");
            counter = None;
        }
        _ => {}
    }

    if let (Some(p), Some(q)) = (&path_issuer, &param_issuer) {
        if p != q {
            log::warn!("otpauth: label issuer {:?} differs from issuer parameter {:?}", p, q);
        }
    }

    Ok(ProvisioningUri {
        kind,
        // prefer the query parameter, then the label prefix
        issuer: param_issuer.or(path_issuer),
        user,
        secret,
        counter,
        algorithm,
        digits,
        period,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  URL encoding helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Percent-encode everything except unreserved characters and `/`.
fn url_encode(s: &str) -> String {
    let mut output = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                output.push(byte as char);
            }
            _ => output.push_str(&format!("%{:02X}", byte)),
        }
    }
    output
}

fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_key() -> Secret {
        Secret::new(b"Hello!\xDE\xAD\xBE\xEF".to_vec()).unwrap()
    }

    // ── Generate ─────────────────────────────────────────────────

    #[test]
    fn build_totp_uri() {
        let (secret, uri) = generate(
            OtpKind::Totp,
            b"Hello!\xDE\xAD\xBE\xEF",
            "alice@google.com",
            "Example",
            None,
        )
        .unwrap();
        assert_eq!(secret, "JBSWY3DPEHPK3PXP");
        assert_eq!(
            uri,
            "otpauth://totp/Example:alice%40google.com?secret=JBSWY3DPEHPK3PXP&issuer=Example"
        );
    }

    #[test]
    fn build_hotp_uri() {
        let uri =
            build_otpauth_uri(OtpKind::Hotp, &hello_key(), "alice@google.com", "Example", Some(42))
                .unwrap();
        assert_eq!(
            uri,
            "otpauth://hotp/Example:alice%40google.com?secret=JBSWY3DPEHPK3PXP&issuer=Example&counter=42"
        );
    }

    #[test]
    fn counter_rules() {
        let err = build_otpauth_uri(OtpKind::Hotp, &hello_key(), "a", "b", None).unwrap_err();
        assert_eq!(err.kind, OathErrorKind::InvalidCounter);
        let err = build_otpauth_uri(OtpKind::Totp, &hello_key(), "a", "b", Some(1)).unwrap_err();
        assert_eq!(err.kind, OathErrorKind::InvalidCounter);
    }

    #[test]
    fn build_escapes_fields() {
        let secret = Secret::new(b"foo".to_vec()).unwrap();
        let uri = build_otpauth_uri(OtpKind::Totp, &secret, "my user", "Acme: Inc", None).unwrap();
        assert_eq!(
            uri,
            "otpauth://totp/Acme%3A%20Inc:my%20user?secret=MZXW6%3D%3D%3D&issuer=Acme%3A%20Inc"
        );
    }

    // ── Parse ────────────────────────────────────────────────────

    #[test]
    fn parse_basic_totp() {
        let parsed = parse_otpauth_uri(
            "otpauth://totp/Example:alice%40google.com?secret=JBSWY3DPEHPK3PXP&issuer=Example",
        )
        .unwrap();
        assert_eq!(parsed.kind, OtpKind::Totp);
        assert_eq!(parsed.user, "alice@google.com");
        assert_eq!(parsed.issuer.as_deref(), Some("Example"));
        assert_eq!(parsed.secret, hello_key());
        assert_eq!(parsed.counter, None);
    }

    #[test]
    fn parse_optional_params() {
        let parsed = parse_otpauth_uri(
            "otpauth://totp/GitHub:user?secret=JBSWY3DPEHPK3PXP&algorithm=SHA256&digits=8&period=60",
        )
        .unwrap();
        assert_eq!(parsed.algorithm, Some(Algorithm::Sha256));
        assert_eq!(parsed.digits, Some(8));
        assert_eq!(parsed.period, Some(60));
        assert_eq!(parsed.issuer.as_deref(), Some("GitHub"));
    }

    #[test]
    fn parse_hotp_requires_counter() {
        let err = parse_otpauth_uri("otpauth://hotp/A:b?secret=JBSWY3DPEHPK3PXP").unwrap_err();
        assert_eq!(err.kind, OathErrorKind::InvalidCounter);
        let ok = parse_otpauth_uri("otpauth://hotp/A:b?secret=JBSWY3DPEHPK3PXP&counter=7").unwrap();
        assert_eq!(ok.counter, Some(7));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            parse_otpauth_uri("https://example.com").unwrap_err().kind,
            OathErrorKind::InvalidUri
        );
        assert!(parse_otpauth_uri("not a url at all").is_err());
        assert!(parse_otpauth_uri("otpauth://motp/A:b?secret=JBSWY3DPEHPK3PXP").is_err());
        assert!(parse_otpauth_uri("otpauth://totp/A:b?issuer=A").is_err());
        assert_eq!(
            parse_otpauth_uri("otpauth://totp/A:b?secret=NIXnix").unwrap_err().kind,
            OathErrorKind::InvalidBase32
        );
        assert_eq!(
            parse_otpauth_uri("otpauth://totp/A:b?secret=JBSWY3DPEHPK3PXP&digits=4")
                .unwrap_err()
                .kind,
            OathErrorKind::InvalidDigits
        );
    }

    #[test]
    fn parse_build_roundtrip() {
        let original = "otpauth://hotp/My%20Corp:bob%40example.com?secret=JBSWY3DPEHPK3PXP&issuer=My%20Corp&counter=42";
        let parsed = parse_otpauth_uri(original).unwrap();
        assert_eq!(parsed.issuer.as_deref(), Some("My Corp"));
        assert_eq!(parsed.user, "bob@example.com");
        assert_eq!(parsed.to_uri().unwrap(), original);
    }

    #[test]
    fn issuer_with_colon_roundtrip() {
        let uri = build_otpauth_uri(OtpKind::Totp, &hello_key(), "my user", "Acme: Inc", None).unwrap();
        assert!(uri.starts_with("otpauth://totp/Acme%3A%20Inc:my%20user?"));
        let parsed = parse_otpauth_uri(&uri).unwrap();
        assert_eq!(parsed.issuer.as_deref(), Some("Acme: Inc"));
        assert_eq!(parsed.user, "my user");
        assert_eq!(parsed.to_uri().unwrap(), uri);
    }

    #[test]
    fn label_issuer_with_colon_without_param() {
        let parsed =
            parse_otpauth_uri("otpauth://totp/Acme%3A%20Inc:my%20user?secret=JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!(parsed.issuer.as_deref(), Some("Acme: Inc"));
        assert_eq!(parsed.user, "my user");
    }

    // ── URL encoding helpers ─────────────────────────────────────

    #[test]
    fn url_encode_basic() {
        assert_eq!(url_encode("hello"), "hello");
        assert_eq!(url_encode("hello world"), "hello%20world");
        assert_eq!(url_encode("a@b"), "a%40b");
        assert_eq!(url_encode("a/b"), "a/b");
        assert_eq!(url_encode("é"), "%C3%A9");
    }

    #[test]
    fn url_decode_basic() {
        assert_eq!(url_decode("hello%20world"), "hello world");
        assert_eq!(url_decode("a%40b"), "a@b");
        assert_eq!(url_decode("%C3%A9"), "é");
        assert_eq!(url_decode("100%"), "100%");
        assert_eq!(url_decode("%zz"), "%zz");
    }
}
