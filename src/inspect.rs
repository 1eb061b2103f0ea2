//! Token inspection for display.
//!
//! [`decode`] does NOT verify the signature. It only splits a token and
//! decodes its header and claims so a human can read them. Never use its
//! output to make a trust decision.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

const MALFORMED_TOKEN: &str = "malformed token";
const MALFORMED_SEGMENT: &str = "malformed segment";

/// Shown in place of a timestamp the token does not carry.
pub const UNAVAILABLE: &str = "unavailable";

/// Read-only view of a compact token. The signature is kept as text and is
/// never checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedToken {
    pub header: Map<String, Value>,
    pub claims: Map<String, Value>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub signature: String,
}

impl DecodedToken {
    pub fn issued_at_display(&self) -> String {
        display_time(self.issued_at)
    }

    pub fn expires_at_display(&self) -> String {
        display_time(self.expires_at)
    }

    /// `None` when the token has no usable `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> Option<bool> {
        self.expires_at.map(|exp| exp <= now)
    }
}

fn display_time(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

/// Split and decode a compact token. Display only; see the module docs.
pub fn decode(token: &str) -> Result<DecodedToken> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(Error::decode(MALFORMED_TOKEN));
    }

    let header = decode_object(parts[0])?;
    let claims = decode_object(parts[1])?;

    let signature = parts[2];
    if !signature
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(Error::decode(MALFORMED_SEGMENT));
    }

    let issued_at = timestamp(&claims, "iat");
    let expires_at = timestamp(&claims, "exp");

    Ok(DecodedToken {
        header,
        claims,
        issued_at,
        expires_at,
        signature: signature.to_string(),
    })
}

fn decode_object(segment: &str) -> Result<Map<String, Value>> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| Error::decode(MALFORMED_SEGMENT))?;
    let text = String::from_utf8(bytes).map_err(|_| Error::decode(MALFORMED_SEGMENT))?;
    match serde_json::from_str(&text) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(Error::decode(MALFORMED_SEGMENT)),
    }
}

fn timestamp(claims: &Map<String, Value>, name: &str) -> Option<DateTime<Utc>> {
    let secs = claims.get(name)?.as_i64()?;
    DateTime::from_timestamp(secs, 0)
}
